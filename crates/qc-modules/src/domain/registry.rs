//! Versioned module registry.
//!
//! Built once at startup from `(module, from_version, to_version)` entries and
//! read-only afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use shared_types::{AppVersion, ConsensusVersion};
use tracing::{info, warn};

use crate::domain::configurator::Configurator;
use crate::domain::module::{Module, VersionedModule};
use crate::error::{ModuleError, ModuleResult};

/// Module that runs after every other module during migrations.
pub const RUN_LAST_MIGRATION_MODULE: &str = "auth";

/// Modules active at one app version, keyed by name.
pub type ModuleSet = BTreeMap<&'static str, Arc<dyn Module>>;

pub struct ModuleRegistry {
    entries: Vec<VersionedModule>,
    versioned: BTreeMap<AppVersion, ModuleSet>,
    first_version: AppVersion,
    last_version: AppVersion,
    pub(crate) order_init_genesis: Vec<&'static str>,
    pub(crate) order_export_genesis: Vec<&'static str>,
    pub(crate) order_pre_block: Vec<&'static str>,
    pub(crate) order_post_block: Vec<&'static str>,
    pub(crate) order_migrations: Vec<&'static str>,
}

impl ModuleRegistry {
    /// Validate entries and build the version to module mapping.
    pub fn build(entries: Vec<VersionedModule>) -> ModuleResult<Self> {
        if entries.is_empty() {
            return Err(ModuleError::EmptyRegistry);
        }

        let mut versioned: BTreeMap<AppVersion, ModuleSet> = BTreeMap::new();
        let mut registration_order: Vec<&'static str> = Vec::new();
        let mut first_version = AppVersion::MAX;
        let mut last_version = 0;

        for entry in &entries {
            let name = entry.name();
            if entry.from_version == 0 || entry.from_version > entry.to_version {
                return Err(ModuleError::InvalidVersionRange {
                    module: name.to_string(),
                    from: entry.from_version,
                    to: entry.to_version,
                });
            }
            for version in entry.from_version..=entry.to_version {
                let set = versioned.entry(version).or_default();
                if set.contains_key(name) {
                    return Err(ModuleError::DuplicateModule {
                        module: name.to_string(),
                        version,
                    });
                }
                set.insert(name, Arc::clone(&entry.module));
            }
            if !registration_order.contains(&name) {
                registration_order.push(name);
            }
            first_version = first_version.min(entry.from_version);
            last_version = last_version.max(entry.to_version);
        }

        check_upgrade_schedule(&versioned, &registration_order)?;

        let registry = Self {
            order_migrations: default_migrations_order(&registration_order),
            order_init_genesis: registration_order.clone(),
            order_export_genesis: registration_order.clone(),
            order_pre_block: registration_order.clone(),
            order_post_block: registration_order,
            entries,
            versioned,
            first_version,
            last_version,
        };

        for name in registry.modules_removed_before_last() {
            warn!(
                module = name,
                last_version = registry.last_version,
                "Module is absent at the latest app version; its removal cannot be migrated"
            );
        }
        info!(
            first_version = registry.first_version,
            last_version = registry.last_version,
            modules = registry.order_init_genesis.len(),
            "Module registry built"
        );
        Ok(registry)
    }

    fn modules_removed_before_last(&self) -> Vec<&'static str> {
        let latest = self.versioned.get(&self.last_version);
        self.order_init_genesis
            .iter()
            .copied()
            .filter(|name| latest.map_or(true, |set| !set.contains_key(name)))
            .collect()
    }

    /// Modules active at `version`. An unconfigured version is fatal.
    pub fn active_modules(&self, version: AppVersion) -> ModuleResult<&ModuleSet> {
        self.versioned
            .get(&version)
            .ok_or(ModuleError::UnsupportedVersion { version })
    }

    pub fn is_supported(&self, version: AppVersion) -> bool {
        self.versioned.contains_key(&version)
    }

    /// Every app version at least one module is registered for, ascending.
    pub fn supported_versions(&self) -> Vec<AppVersion> {
        self.versioned.keys().copied().collect()
    }

    pub fn first_version(&self) -> AppVersion {
        self.first_version
    }

    pub fn last_version(&self) -> AppVersion {
        self.last_version
    }

    /// Sorted names of the modules active at `version`.
    pub fn module_names(&self, version: AppVersion) -> Vec<&'static str> {
        self.versioned
            .get(&version)
            .map(|set| set.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Module name to consensus version at `version`; empty when unsupported.
    pub fn version_map(&self, version: AppVersion) -> BTreeMap<String, ConsensusVersion> {
        self.versioned
            .get(&version)
            .map(|set| {
                set.iter()
                    .map(|(name, module)| (name.to_string(), module.consensus_version()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// App versions at which `module` runs with `consensus_version`.
    pub fn app_versions_for_module(
        &self,
        module: &str,
        consensus_version: ConsensusVersion,
    ) -> Vec<AppVersion> {
        self.versioned
            .iter()
            .filter(|(_, set)| {
                set.get(module)
                    .is_some_and(|m| m.consensus_version() == consensus_version)
            })
            .map(|(version, _)| *version)
            .collect()
    }

    /// Verify an externally declared module list covers every registered module.
    pub fn assert_matching_modules(&self, names: &[&str]) -> ModuleResult<()> {
        assert_no_forgotten("genesis", &self.order_init_genesis, names)
    }

    pub fn entries(&self) -> &[VersionedModule] {
        &self.entries
    }

    /// Let each registered entry register its messages and migrations.
    pub fn register_services(&self, cfg: &mut Configurator) -> ModuleResult<()> {
        for entry in &self.entries {
            let mut scoped = cfg.scoped(entry.name(), entry.from_version, entry.to_version);
            entry.module.register_services(&mut scoped)?;
        }
        Ok(())
    }

    pub fn order_migrations(&self) -> &[&'static str] {
        &self.order_migrations
    }

    pub fn set_order_init_genesis(&mut self, order: Vec<&'static str>) -> ModuleResult<()> {
        self.order_init_genesis = self.checked_order("set_order_init_genesis", order)?;
        Ok(())
    }

    pub fn set_order_export_genesis(&mut self, order: Vec<&'static str>) -> ModuleResult<()> {
        self.order_export_genesis = self.checked_order("set_order_export_genesis", order)?;
        Ok(())
    }

    pub fn set_order_pre_block(&mut self, order: Vec<&'static str>) -> ModuleResult<()> {
        self.order_pre_block = self.checked_order("set_order_pre_block", order)?;
        Ok(())
    }

    pub fn set_order_post_block(&mut self, order: Vec<&'static str>) -> ModuleResult<()> {
        self.order_post_block = self.checked_order("set_order_post_block", order)?;
        Ok(())
    }

    pub fn set_order_migrations(&mut self, order: Vec<&'static str>) -> ModuleResult<()> {
        self.order_migrations = self.checked_order("set_order_migrations", order)?;
        Ok(())
    }

    fn checked_order(
        &self,
        setter: &str,
        order: Vec<&'static str>,
    ) -> ModuleResult<Vec<&'static str>> {
        if let Some(unknown) = order
            .iter()
            .find(|name| !self.order_init_genesis.contains(*name))
        {
            return Err(ModuleError::UnknownModuleInOrder {
                setter: setter.to_string(),
                module: unknown.to_string(),
            });
        }
        assert_no_forgotten(setter, &self.order_init_genesis, &order)?;
        Ok(order)
    }
}

fn assert_no_forgotten(
    setter: &str,
    registered: &[&'static str],
    given: &[&str],
) -> ModuleResult<()> {
    let given: BTreeSet<&str> = given.iter().copied().collect();
    let missing: Vec<String> = registered
        .iter()
        .filter(|name| !given.contains(*name))
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ModuleError::ForgottenModules {
            setter: setter.to_string(),
            missing,
        })
    }
}

/// Lexicographic by name, with [`RUN_LAST_MIGRATION_MODULE`] moved to the end.
fn default_migrations_order(names: &[&'static str]) -> Vec<&'static str> {
    let mut order: Vec<&'static str> = names
        .iter()
        .copied()
        .filter(|name| *name != RUN_LAST_MIGRATION_MODULE)
        .collect();
    order.sort_unstable();
    if names.contains(&RUN_LAST_MIGRATION_MODULE) {
        order.push(RUN_LAST_MIGRATION_MODULE);
    }
    order
}

/// Consensus versions must not decrease as app versions increase.
fn check_upgrade_schedule(
    versioned: &BTreeMap<AppVersion, ModuleSet>,
    names: &[&'static str],
) -> ModuleResult<()> {
    for name in names {
        let mut previous: Option<ConsensusVersion> = None;
        for (version, set) in versioned {
            let Some(module) = set.get(name) else {
                continue;
            };
            let current = module.consensus_version();
            if let Some(previous) = previous {
                if current < previous {
                    return Err(ModuleError::NonMonotonicConsensusVersion {
                        module: name.to_string(),
                        version: *version,
                        previous,
                        current,
                    });
                }
            }
            previous = Some(current);
        }
    }
    Ok(())
}
