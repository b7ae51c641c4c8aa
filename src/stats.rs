use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub expanded: usize,
    pub generated: usize,
    pub frontier: usize,
    pub time_us: usize,
    pub width_restarts: usize,
    pub plan_length: usize,
}

impl Stats {
    pub fn print(&self) {
        info!(
            "Plan length {:?} Time(microseconds) {:?} Expanded {:?} Generated {:?} Frontier {:?} Width restarts {:?}",
            self.plan_length,
            self.time_us,
            self.expanded,
            self.generated,
            self.frontier,
            self.width_restarts
        );
    }
}
