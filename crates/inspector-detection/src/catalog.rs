//! Builtin + user-authored rule storage (spec §4.9).

use std::sync::{Arc, RwLock};

use inspector_core::{storage::keys, Error, Result, Storage};

use crate::builtin::builtin_rules;
use crate::engine::DetectionEngine;
use crate::rule::DetectionRule;
use crate::validation::validate;

/// Holds the merged builtin + custom rule set, persisting custom-rule
/// mutations through a [`Storage`] collaborator. Builtins always win a
/// same-`id` collision with a stored custom rule (spec §4.9 "Loading
/// merges them, deduplicating by `id` with builtins winning").
pub struct RuleCatalog {
    storage: Arc<dyn Storage>,
    engine: Arc<DetectionEngine>,
    rules: RwLock<Vec<DetectionRule>>,
}

impl std::fmt::Debug for RuleCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleCatalog").finish_non_exhaustive()
    }
}

impl RuleCatalog {
    /// Load builtins merged with whatever custom rules `storage` holds.
    pub fn load(storage: Arc<dyn Storage>, engine: Arc<DetectionEngine>) -> Self {
        let custom = load_custom(&storage);
        let rules = merge(builtin_rules(), custom);
        engine.recompile(&rules);
        Self {
            storage,
            engine,
            rules: RwLock::new(rules),
        }
    }

    pub fn rules(&self) -> Vec<DetectionRule> {
        self.rules.read().expect("rule catalog lock poisoned").clone()
    }

    pub fn find(&self, id: &str) -> Option<DetectionRule> {
        self.rules.read().expect("rule catalog lock poisoned").iter().find(|r| r.id == id).cloned()
    }

    /// Add a user-authored rule after validation. Returns the (possibly
    /// empty) list of non-fatal warnings (e.g. "pattern too broad").
    pub fn add_custom(&self, mut rule: DetectionRule) -> Result<Vec<String>> {
        rule.is_builtin = false;
        rule.enabled = true;
        let warnings = validate(&rule)?;
        {
            let mut rules = self.rules.write().expect("rule catalog lock poisoned");
            if rules.iter().any(|r| r.id == rule.id) {
                return Err(Error::Validation(format!("rule id {} already exists", rule.id)));
            }
            rules.push(rule);
        }
        self.persist_custom();
        self.engine.invalidate();
        Ok(warnings)
    }

    /// Update a user-authored rule's editable fields. Builtin rules may
    /// only have `enabled` toggled (spec §4.6 "Builtin rules are read-only
    /// except for their `enabled` bit").
    pub fn update_custom(&self, id: &str, mut updated: DetectionRule) -> Result<Vec<String>> {
        let mut rules = self.rules.write().expect("rule catalog lock poisoned");
        let Some(existing) = rules.iter().find(|r| r.id == id) else {
            return Err(Error::Validation(format!("no rule with id {id}")));
        };
        if existing.is_builtin {
            return Err(Error::Validation("builtin rules cannot be edited".to_string()));
        }
        updated.id = id.to_string();
        updated.is_builtin = false;
        updated.created_at = existing.created_at;
        updated.updated_at = chrono::Utc::now();
        let warnings = validate(&updated)?;

        let idx = rules.iter().position(|r| r.id == id).expect("checked above");
        rules[idx] = updated;
        drop(rules);
        self.persist_custom();
        self.engine.invalidate();
        Ok(warnings)
    }

    /// Toggle a rule's `enabled` bit. Valid for both builtin and custom
    /// rules (spec §4.9 "a rule is ... optionally toggled").
    pub fn toggle(&self, id: &str, enabled: bool) -> Result<()> {
        let mut rules = self.rules.write().expect("rule catalog lock poisoned");
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::Validation(format!("no rule with id {id}")))?;
        rule.enabled = enabled;
        rule.updated_at = chrono::Utc::now();
        let is_builtin = rule.is_builtin;
        drop(rules);
        if !is_builtin {
            self.persist_custom();
        }
        self.engine.invalidate();
        Ok(())
    }

    /// Remove a custom rule. Builtins cannot be deleted.
    pub fn remove_custom(&self, id: &str) -> Result<()> {
        let mut rules = self.rules.write().expect("rule catalog lock poisoned");
        let Some(idx) = rules.iter().position(|r| r.id == id) else {
            return Err(Error::Validation(format!("no rule with id {id}")));
        };
        if rules[idx].is_builtin {
            return Err(Error::Validation("builtin rules cannot be deleted".to_string()));
        }
        rules.remove(idx);
        drop(rules);
        self.persist_custom();
        self.engine.invalidate();
        Ok(())
    }

    /// Import an array of candidate rules as custom rules, validating each
    /// independently; rules that fail validation are skipped and reported.
    pub fn import(&self, candidates: Vec<DetectionRule>) -> (usize, Vec<String>) {
        let mut imported = 0;
        let mut errors = Vec::new();
        for mut candidate in candidates {
            candidate.is_builtin = false;
            match self.add_custom(candidate) {
                Ok(_) => imported += 1,
                Err(e) => errors.push(e.to_string()),
            }
        }
        (imported, errors)
    }

    /// Export only user-authored (non-builtin) rules.
    pub fn export_custom(&self) -> Vec<DetectionRule> {
        self.rules
            .read()
            .expect("rule catalog lock poisoned")
            .iter()
            .filter(|r| !r.is_builtin)
            .cloned()
            .collect()
    }

    /// Wipe custom rules and reload builtins.
    pub fn reset_to_defaults(&self) {
        *self.rules.write().expect("rule catalog lock poisoned") = builtin_rules();
        self.storage.remove(keys::CUSTOM_RULES);
        self.engine.invalidate();
    }

    fn persist_custom(&self) {
        let custom = self.export_custom();
        if let Ok(json) = serde_json::to_string(&custom) {
            self.storage.set(keys::CUSTOM_RULES, json);
        }
    }
}

fn load_custom(storage: &Arc<dyn Storage>) -> Vec<DetectionRule> {
    storage
        .get(keys::CUSTOM_RULES)
        .and_then(|json| serde_json::from_str::<Vec<DetectionRule>>(&json).ok())
        .unwrap_or_default()
}

/// Merge builtins with custom rules, builtins winning on `id` collision.
fn merge(builtins: Vec<DetectionRule>, custom: Vec<DetectionRule>) -> Vec<DetectionRule> {
    let mut merged = builtins;
    let builtin_ids: std::collections::HashSet<&str> =
        merged.iter().map(|r| r.id.as_str()).collect();
    for rule in custom {
        if !builtin_ids.contains(rule.id.as_str()) {
            merged.push(rule);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleCategory, Scope};
    use inspector_core::{MemoryStorage, RiskLevel};

    fn custom_rule(id: &str) -> DetectionRule {
        let now = chrono::Utc::now();
        DetectionRule {
            id: id.to_string(),
            name: "custom".to_string(),
            description: "d".to_string(),
            category: RuleCategory::Custom,
            pattern: "foo".to_string(),
            flags: "g".to_string(),
            scope: Scope::Both,
            risk_level: RiskLevel::Medium,
            threat_type: "custom_marker".to_string(),
            capture_groups: None,
            mask_sensitive_data: false,
            max_matches: 10,
            enabled: true,
            is_builtin: false,
            created_at: now,
            updated_at: now,
            tags: None,
            recommendation: None,
            remediation: None,
            references: None,
        }
    }

    #[test]
    fn load_merges_builtins_and_persisted_custom_rules() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(DetectionEngine::new());
        let catalog = RuleCatalog::load(storage.clone(), engine.clone());
        catalog.add_custom(custom_rule("custom-1")).unwrap();

        let reloaded = RuleCatalog::load(storage, engine);
        assert!(reloaded.find("custom-1").is_some());
        assert!(reloaded.find("builtin-password-leak").is_some());
    }

    #[test]
    fn builtin_wins_id_collision() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(
            keys::CUSTOM_RULES,
            serde_json::to_string(&vec![custom_rule("builtin-password-leak")]).unwrap(),
        );
        let engine = Arc::new(DetectionEngine::new());
        let catalog = RuleCatalog::load(storage, engine);
        let rule = catalog.find("builtin-password-leak").unwrap();
        assert!(rule.is_builtin);
    }

    #[test]
    fn builtin_rules_cannot_be_edited_or_removed() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(DetectionEngine::new());
        let catalog = RuleCatalog::load(storage, engine);
        assert!(catalog.update_custom("builtin-password-leak", custom_rule("builtin-password-leak")).is_err());
        assert!(catalog.remove_custom("builtin-password-leak").is_err());
    }

    #[test]
    fn builtin_rules_can_be_toggled() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(DetectionEngine::new());
        let catalog = RuleCatalog::load(storage, engine);
        catalog.toggle("builtin-password-leak", false).unwrap();
        assert!(!catalog.find("builtin-password-leak").unwrap().enabled);
    }

    #[test]
    fn export_then_import_round_trips_custom_rules() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(DetectionEngine::new());
        let catalog = RuleCatalog::load(storage, engine.clone());
        catalog.add_custom(custom_rule("custom-1")).unwrap();
        let exported = catalog.export_custom();

        let storage2 = Arc::new(MemoryStorage::new());
        let catalog2 = RuleCatalog::load(storage2, engine);
        let (imported, errors) = catalog2.import(exported.clone());
        assert_eq!(imported, 1);
        assert!(errors.is_empty());
        let reexported = catalog2.export_custom();
        assert_eq!(reexported[0].id, exported[0].id);
        assert_eq!(reexported[0].pattern, exported[0].pattern);
    }

    #[test]
    fn reset_to_defaults_wipes_custom_rules() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = Arc::new(DetectionEngine::new());
        let catalog = RuleCatalog::load(storage, engine);
        catalog.add_custom(custom_rule("custom-1")).unwrap();
        catalog.reset_to_defaults();
        assert!(catalog.find("custom-1").is_none());
        assert!(catalog.find("builtin-password-leak").is_some());
    }
}
