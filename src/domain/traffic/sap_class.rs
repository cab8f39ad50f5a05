use crate::domain::scheduler::utility::UtilityFunction;
use crate::domain::utils::id::ClassId;

/// Static descriptor of a Service-Access-Point traffic class.
#[derive(Debug, Clone, PartialEq)]
pub struct SapClass {
    pub id: ClassId,
    pub name: String,

    /// Mean number of packets each node injects per frame (Poisson parameter).
    pub arrival_rate: f64,

    /// Priority coefficient of the utility. Also the initial weight of every queue of this class.
    pub priority: f64,

    /// Throughput (packets per frame and queue) at which the utility has its kink.
    pub target_rate: f64,

    /// Hop budget given to newly created packets.
    pub hop_budget: u32,

    pub utility: UtilityFunction,
}

impl SapClass {
    pub fn new(id: ClassId, arrival_rate: f64, priority: f64, target_rate: f64, hop_budget: u32) -> Self {
        Self {
            id,
            name: format!("SAP-{}", id),
            arrival_rate,
            priority,
            target_rate,
            hop_budget,
            utility: UtilityFunction::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_utility(mut self, utility: UtilityFunction) -> Self {
        self.utility = utility;
        self
    }

    /// Initial weight of a freshly created queue.
    pub fn base_weight(&self) -> f64 {
        self.priority.max(0.0)
    }

    /// Derivative of this class' utility at the throughput estimate `rate`.
    pub fn utility_gradient(&self, rate: f64) -> f64 {
        self.utility.gradient(rate, self.priority, self.target_rate)
    }
}
