// amm-core/src/upgrades.rs

use crate::{BlockNumber, CoreError, CoreResult};

/// Migration run once when its activation height is reached
pub type MigrationFn<C> = fn(&mut C) -> CoreResult<()>;

/// A scheduled chain upgrade
pub struct Upgrade<C> {
    /// Upgrade name, e.g. "v2"
    pub name: String,
    /// Height at which the migration runs
    pub height: BlockNumber,
    /// Migration body
    pub migration: MigrationFn<C>,
}

impl<C> std::fmt::Debug for Upgrade<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upgrade")
            .field("name", &self.name)
            .field("height", &self.height)
            .finish()
    }
}

/// Static table of `(activation_height, migration)` pairs, strictly ordered by height
pub struct UpgradeSchedule<C> {
    upgrades: Vec<Upgrade<C>>,
}

impl<C> Default for UpgradeSchedule<C> {
    fn default() -> Self {
        Self { upgrades: Vec::new() }
    }
}

impl<C> UpgradeSchedule<C> {
    /// Create an empty schedule
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an upgrade. Heights must be strictly increasing and names unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        height: BlockNumber,
        migration: MigrationFn<C>,
    ) -> CoreResult<()> {
        let name = name.into();
        if height == 0 {
            return Err(CoreError::UpgradeError(format!(
                "upgrade '{}' cannot activate at genesis",
                name
            )));
        }
        if let Some(last) = self.upgrades.last() {
            if height <= last.height {
                return Err(CoreError::UpgradeError(format!(
                    "upgrade '{}' at {} must come after '{}' at {}",
                    name, height, last.name, last.height
                )));
            }
        }
        if self.upgrades.iter().any(|u| u.name == name) {
            return Err(CoreError::UpgradeError(format!("duplicate upgrade '{}'", name)));
        }
        self.upgrades.push(Upgrade {
            name,
            height,
            migration,
        });
        Ok(())
    }

    /// Upgrade activating exactly at `height`, if any
    pub fn upgrade_at(&self, height: BlockNumber) -> Option<&Upgrade<C>> {
        self.upgrades
            .binary_search_by_key(&height, |u| u.height)
            .ok()
            .map(|idx| &self.upgrades[idx])
    }

    /// All scheduled upgrades
    pub fn upgrades(&self) -> &[Upgrade<C>] {
        &self.upgrades
    }

    /// Run the migration scheduled for `height`; returns its name if one ran
    pub fn apply(&self, height: BlockNumber, ctx: &mut C) -> CoreResult<Option<String>> {
        let Some(upgrade) = self.upgrade_at(height) else {
            return Ok(None);
        };

        tracing::info!("Applying upgrade '{}' at height {}", upgrade.name, height);
        (upgrade.migration)(ctx).map_err(|e| {
            CoreError::UpgradeError(format!("upgrade '{}' failed: {}", upgrade.name, e))
        })?;
        tracing::info!("Upgrade '{}' applied", upgrade.name);

        Ok(Some(upgrade.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump(counter: &mut u32) -> CoreResult<()> {
        *counter += 1;
        Ok(())
    }

    fn double(counter: &mut u32) -> CoreResult<()> {
        *counter *= 2;
        Ok(())
    }

    fn broken(_counter: &mut u32) -> CoreResult<()> {
        Err(CoreError::ParseError("bad state".into()))
    }

    #[test]
    fn test_apply_runs_only_at_activation_height() {
        let mut schedule: UpgradeSchedule<u32> = UpgradeSchedule::new();
        schedule.register("v2", 10, bump).unwrap();
        schedule.register("v3", 20, double).unwrap();

        let mut counter = 1u32;
        for height in 1..=25 {
            schedule.apply(height, &mut counter).unwrap();
        }
        // (1 + 1) * 2
        assert_eq!(counter, 4);
        assert_eq!(schedule.upgrade_at(20).unwrap().name, "v3");
        assert!(schedule.upgrade_at(15).is_none());
    }

    #[test]
    fn test_heights_must_increase() {
        let mut schedule: UpgradeSchedule<u32> = UpgradeSchedule::new();
        schedule.register("v2", 10, bump).unwrap();
        assert!(schedule.register("v3", 10, double).is_err());
        assert!(schedule.register("v1", 5, double).is_err());
        assert!(schedule.register("v2", 30, double).is_err());
        assert!(schedule.register("v0", 0, double).is_err());
    }

    #[test]
    fn test_failed_migration_is_reported() {
        let mut schedule: UpgradeSchedule<u32> = UpgradeSchedule::new();
        schedule.register("v4", 3, broken).unwrap();

        let mut counter = 0u32;
        let err = schedule.apply(3, &mut counter).unwrap_err();
        assert!(matches!(err, CoreError::UpgradeError(msg) if msg.contains("v4")));
    }
}
