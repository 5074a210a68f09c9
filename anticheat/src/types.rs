/// A single client-reported position/velocity/orientation sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub position: (f64, f64, f64),
    pub yaw: f64,
    pub velocity: f64,
    pub timestamp_ms: u64,
    pub on_track: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Velocity,
    Acceleration,
    PositionJump,
    Teleport,
    YawRate,
    Stuck,
    InputRate,
}

impl Rule {
    pub fn severity(self) -> Severity {
        match self {
            Rule::Velocity | Rule::PositionJump | Rule::Teleport => Severity::High,
            Rule::Acceleration | Rule::YawRate | Rule::InputRate => Severity::Medium,
            Rule::Stuck => Severity::Low,
        }
    }

    /// Whether a violation of this rule fails the update outright (vs.
    /// warn-only).
    pub fn fails_update(self) -> bool {
        matches!(self.severity(), Severity::High)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Violation {
    pub rule: Rule,
    pub timestamp_ms: u64,
}
