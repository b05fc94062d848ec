use crate::error::TrialError;
use crate::trial::{StudyItemsTrial, TrialPlugin};
use serde_json::Value;
use std::collections::BTreeMap;
use study_core::classify;

/// Identifier of the built-in study-items trial type
pub const STUDY_ITEMS: &str = "pcllab-study-items";

pub type TrialConstructor = fn(&Value) -> Result<Box<dyn TrialPlugin>, TrialError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
}

/// A trial parameter whose values must be fetched before the trial starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadDecl {
    pub parameter: &'static str,
    pub kind: AssetKind,
}

struct Registration {
    constructor: TrialConstructor,
    preload: Vec<PreloadDecl>,
}

/// Trial-type table of the host runner
#[derive(Default)]
pub struct TrialTypeRegistry {
    types: BTreeMap<&'static str, Registration>,
}

impl TrialTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every trial type shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(STUDY_ITEMS, StudyItemsTrial::from_params)
            .register_preload(STUDY_ITEMS, "stimuli", AssetKind::Image);
        registry
    }

    pub fn register(&mut self, name: &'static str, constructor: TrialConstructor) -> &mut Self {
        self.types.insert(
            name,
            Registration {
                constructor,
                preload: Vec::new(),
            },
        );
        self
    }

    /// Declares that `parameter` of `name` trials holds assets of `kind`.
    /// Ignored for unregistered types.
    pub fn register_preload(
        &mut self,
        name: &str,
        parameter: &'static str,
        kind: AssetKind,
    ) -> &mut Self {
        if let Some(reg) = self.types.get_mut(name) {
            reg.preload.push(PreloadDecl { parameter, kind });
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    pub fn create(&self, name: &str, params: &Value) -> Result<Box<dyn TrialPlugin>, TrialError> {
        let reg = self
            .types
            .get(name)
            .ok_or_else(|| TrialError::UnknownTrialType(name.to_string()))?;
        (reg.constructor)(params)
    }

    pub fn preload_decls(&self, name: &str) -> &[PreloadDecl] {
        self.types
            .get(name)
            .map(|reg| reg.preload.as_slice())
            .unwrap_or_default()
    }

    /// Image tokens referenced by the declared preload parameters of a trial,
    /// deduplicated in first-seen order. Text tokens are skipped.
    pub fn image_assets(&self, name: &str, params: &Value) -> Result<Vec<String>, TrialError> {
        if !self.contains(name) {
            return Err(TrialError::UnknownTrialType(name.to_string()));
        }
        let mut tokens = Vec::new();
        for decl in self.preload_decls(name) {
            match decl.kind {
                AssetKind::Image => {
                    if let Some(value) = params.get(decl.parameter) {
                        collect_strings(value, &mut tokens);
                    }
                }
            }
        }
        let mut images: Vec<String> = Vec::new();
        for token in tokens {
            if classify(token).is_image() && !images.iter().any(|t| t == token) {
                images.push(token.to_string());
            }
        }
        Ok(images)
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_knows_study_items() {
        let registry = TrialTypeRegistry::builtin();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![STUDY_ITEMS]);
        assert_eq!(
            registry.preload_decls(STUDY_ITEMS),
            [PreloadDecl {
                parameter: "stimuli",
                kind: AssetKind::Image
            }]
        );
        let trial = registry
            .create(STUDY_ITEMS, &json!({"stimuli": ["a"]}))
            .ok()
            .unwrap();
        assert_eq!(trial.trial_type(), STUDY_ITEMS);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let registry = TrialTypeRegistry::builtin();
        let err = registry.create("html-keyboard", &json!({})).err().unwrap();
        assert!(matches!(err, TrialError::UnknownTrialType(ref n) if n == "html-keyboard"));
        assert!(registry.preload_decls("html-keyboard").is_empty());
    }

    #[test]
    fn image_assets_are_collected_from_groups() {
        let registry = TrialTypeRegistry::builtin();
        let params = json!({
            "stimuli": ["cat.jpg", ["dog.PNG", "word", "cat.jpg"], "a phrase", "doc.pdf"],
            "frame_time": 100
        });
        assert_eq!(
            registry.image_assets(STUDY_ITEMS, &params).unwrap(),
            vec!["cat.jpg".to_string(), "dog.PNG".to_string()]
        );
    }

    #[test]
    fn custom_types_can_be_registered() {
        fn build(params: &Value) -> Result<Box<dyn TrialPlugin>, TrialError> {
            StudyItemsTrial::from_params(params)
        }
        let mut registry = TrialTypeRegistry::new();
        registry
            .register("rsvp", build)
            .register_preload("rsvp", "stimuli", AssetKind::Image)
            .register_preload("missing", "stimuli", AssetKind::Image);
        assert!(registry.contains("rsvp"));
        assert!(!registry.contains("missing"));
        assert!(registry.create("rsvp", &json!({"stimuli": []})).is_ok());
    }
}
