pub mod chronology;
pub mod deliveries;
pub mod demography;
pub mod disease;
pub mod milestones;
pub mod production;
pub mod storage;

pub use chronology::{ChronologyEngine, TickResult};
pub use deliveries::{DeliveryEngine, DeliveryResult, Doctrine};
pub use demography::{DemographicTickResult, DemographyEngine};
pub use disease::{DiseaseEngine, DiseaseTickResult};
pub use milestones::MilestoneTracker;
pub use production::{BuildingProduction, ProductionOutput, ProductionSource};
pub use storage::{StorageEngine, StorageResult};
