//! Cascade generation: `index.js` ⇒ `modern.js` ⇒ `legacy.js`.
//!
//! Each checking fragment embeds the detection prefix, a `needsPolyfill`
//! helper and the de-duplicated predicates of the tier it gates, each
//! wrapped in a thunk so a throwing expression counts as a failed check
//! instead of aborting module evaluation. When the
//! check fails it dynamically imports the next fragment and resolves with
//! that fragment's default export; otherwise it resolves immediately.
//! Module imports are unconditional side-effect imports, one tier each.

use crate::check_map::{CheckMap, TierChecks};
use crate::error::KernelError;
use crate::module::{ModuleId, SourceFragment};
use crate::partition::{Partition, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use tracing::debug;

pub const ENTRY_FRAGMENT: &str = "index.js";
pub const MODERN_FRAGMENT: &str = "modern.js";
pub const LEGACY_FRAGMENT: &str = "legacy.js";

const NEEDS_POLYFILL: &str = r#"function needsPolyfill(tests) {
  function passes(test) {
    if (typeof test == 'function') return !!test();
    if (Array.isArray(test)) {
      for (var j = 0; j < test.length; j++) {
        if (!passes(test[j])) return false;
      }
      return true;
    }
    return !!test;
  }
  for (var i = 0; i < tests.length; i++) {
    try {
      if (!passes(tests[i]())) return true;
    } catch (error) {
      return true;
    }
  }
  return false;
}"#;

/// Code-generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOptions {
    /// Prepended to a module identifier to form its import specifier.
    pub module_prefix: String,

    /// Specifier whose default export replaces the harness channel.
    pub global_import: String,

    /// Identifier the detection prefix and predicates use for the global
    /// object.
    pub harness_channel: String,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self {
            module_prefix: "core-js/modules/".to_string(),
            global_import: "core-js/internals/global-this".to_string(),
            harness_channel: "GLOBAL".to_string(),
        }
    }
}

impl CascadeOptions {
    fn specifier(&self, module: &ModuleId) -> String {
        format!("{}{}", self.module_prefix, module)
    }
}

/// What a fragment does after its own imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Gate {
    /// Last tier: nothing follows.
    Terminal,
    /// Nothing left to load: resolve immediately.
    Resolved,
    /// Some module of the next tier has no predicates: always load it.
    Always { target: String },
    /// Load `target` only if a predicate fails.
    Check {
        target: String,
        predicates: Vec<SourceFragment>,
    },
}

impl Gate {
    fn for_tier(checks: &TierChecks, target: &str) -> Self {
        if checks.is_empty() {
            return Gate::Resolved;
        }
        if checks.unchecked().next().is_some() {
            return Gate::Always {
                target: target.to_string(),
            };
        }
        Gate::Check {
            target: target.to_string(),
            predicates: checks.merged(),
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Gate::Always { target } | Gate::Check { target, .. } => Some(target),
            Gate::Terminal | Gate::Resolved => None,
        }
    }
}

/// One generated program unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub name: String,
    pub tier: Option<Tier>,
    pub imports: Vec<ModuleId>,
    pub gate: Gate,
    pub source: String,
}

/// Named virtual sources for the bundle emitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualInputs {
    /// Logical filename of the bundle entry.
    pub entry: String,
    /// Logical filename → source text.
    pub sources: BTreeMap<String, String>,
}

impl VirtualInputs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }
}

/// The three generated fragments, entry first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cascade {
    pub fragments: Vec<Fragment>,
}

impl Cascade {
    pub fn fragment(&self, name: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|fragment| fragment.name == name)
    }

    pub fn entry(&self) -> Option<&Fragment> {
        self.fragment(ENTRY_FRAGMENT)
    }

    pub fn to_virtual_inputs(&self) -> VirtualInputs {
        VirtualInputs {
            entry: ENTRY_FRAGMENT.to_string(),
            sources: self
                .fragments
                .iter()
                .map(|fragment| (fragment.name.clone(), fragment.source.clone()))
                .collect(),
        }
    }

    /// Every stable module is imported exactly once, by the fragment of
    /// its own tier, and every gate points at an existing fragment.
    pub fn verify(&self, partition: &Partition) -> Result<(), KernelError> {
        let mut imported = BTreeSet::new();
        for fragment in &self.fragments {
            let expected: &[ModuleId] = match fragment.tier {
                Some(tier) => partition.tier(tier),
                None => &[],
            };
            let expected: BTreeSet<&ModuleId> = expected.iter().collect();
            for module in &fragment.imports {
                if !expected.contains(module) {
                    return Err(KernelError::Cascade {
                        fragment: fragment.name.clone(),
                        description: format!("imports `{module}` from outside its tier"),
                    });
                }
                if !imported.insert(module) {
                    return Err(KernelError::Cascade {
                        fragment: fragment.name.clone(),
                        description: format!("imports `{module}` more than once"),
                    });
                }
            }
            if let Some(target) = fragment.gate.target()
                && self.fragment(target).is_none()
            {
                return Err(KernelError::Cascade {
                    fragment: fragment.name.clone(),
                    description: format!("loads unknown fragment `{target}`"),
                });
            }
        }
        if let Some(missing) = partition.stable.iter().find(|m| !imported.contains(m)) {
            return Err(KernelError::Cascade {
                fragment: ENTRY_FRAGMENT.to_string(),
                description: format!("`{missing}` is never imported"),
            });
        }
        Ok(())
    }
}

/// Generate the cascade for `partition`.
///
/// `detection_prefix` is the helper source the predicates depend on; it
/// is embedded in every fragment that evaluates predicates.
pub fn generate_cascade(
    partition: &Partition,
    checks: &CheckMap,
    detection_prefix: &str,
    options: &CascadeOptions,
) -> Result<Cascade, KernelError> {
    partition.verify()?;

    let modern_checks = checks.tier(partition, Tier::Modern);
    let legacy_checks = checks.tier(partition, Tier::Legacy);

    // The entry gates on the first tier that has anything to load.
    let entry_gate = if modern_checks.is_empty() {
        Gate::for_tier(&legacy_checks, LEGACY_FRAGMENT)
    } else {
        Gate::for_tier(&modern_checks, MODERN_FRAGMENT)
    };
    let modern_gate = Gate::for_tier(&legacy_checks, LEGACY_FRAGMENT);

    let fragments = vec![
        build_fragment(ENTRY_FRAGMENT, None, &[], entry_gate, detection_prefix, options),
        build_fragment(
            MODERN_FRAGMENT,
            Some(Tier::Modern),
            &partition.modern,
            modern_gate,
            detection_prefix,
            options,
        ),
        build_fragment(
            LEGACY_FRAGMENT,
            Some(Tier::Legacy),
            &partition.legacy,
            Gate::Terminal,
            detection_prefix,
            options,
        ),
    ];

    for fragment in &fragments {
        debug!(
            target: "polyp::cascade",
            fragment = %fragment.name,
            imports = fragment.imports.len(),
            gate = ?fragment.gate.target(),
            "generated fragment"
        );
    }

    let cascade = Cascade { fragments };
    cascade.verify(partition)?;
    Ok(cascade)
}

fn build_fragment(
    name: &str,
    tier: Option<Tier>,
    modules: &[ModuleId],
    gate: Gate,
    detection_prefix: &str,
    options: &CascadeOptions,
) -> Fragment {
    let mut source = String::new();
    for module in modules {
        let _ = writeln!(source, "import {};", js_string(&options.specifier(module)));
    }

    match &gate {
        Gate::Terminal => {}
        Gate::Resolved => {
            source.push_str("export default Promise.resolve();\n");
        }
        Gate::Always { target } => {
            let _ = writeln!(source, "export default {};", load_expression(target));
        }
        Gate::Check { target, predicates } => {
            let _ = writeln!(
                source,
                "import {} from {};",
                options.harness_channel,
                js_string(&options.global_import)
            );
            if !detection_prefix.trim().is_empty() {
                source.push_str(detection_prefix.trim_end());
                source.push('\n');
            }
            source.push_str(NEEDS_POLYFILL);
            source.push('\n');
            let thunks: Vec<String> = predicates.iter().map(SourceFragment::thunk).collect();
            let _ = writeln!(
                source,
                "export default needsPolyfill([\n  {}\n]) ? {} : Promise.resolve();",
                thunks.join(",\n  "),
                load_expression(target)
            );
        }
    }

    Fragment {
        name: name.to_string(),
        tier,
        imports: modules.to_vec(),
        gate,
        source,
    }
}

fn load_expression(target: &str) -> String {
    format!(
        "import({}).then(function (module) {{ return module.default; }})",
        js_string(&format!("./{target}"))
    )
}

/// A JSON string literal is a valid JS string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
