use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Scenario name cannot be empty")]
    EmptyName,

    #[error("Scenario '{0}' has an empty tag")]
    EmptyTag(String),

    #[error("Scenario '{0}' needs at least one VU")]
    NoVus(String),

    #[error("Scenario '{0}' has a zero duration")]
    ZeroDuration(String),

    #[error("Scenario '{0}' has no stages")]
    NoStages(String),

    #[error("Scenario '{0}' has a zero time unit")]
    ZeroTimeUnit(String),

    #[error("Scenario '{name}' pre-allocates {pre_allocated} VUs but allows at most {max}")]
    VuBounds {
        name: String,
        pre_allocated: usize,
        max: usize,
    },

    #[error("Scenario name '{0}' is used more than once")]
    DuplicateName(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdParseError {
    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Malformed metric selector '{0}'")]
    MalformedSelector(String),

    #[error("Unsupported tag key '{0}', only 'scenario' is supported")]
    UnsupportedTag(String),

    #[error("Malformed threshold expression '{0}'")]
    MalformedExpression(String),

    #[error("Unknown aggregation '{0}'")]
    UnknownAggregation(String),

    #[error("Aggregation '{aggregation}' does not apply to metric '{metric}'")]
    Inapplicable { metric: String, aggregation: String },

    #[error("Percentile must be within 0..=100, got {0}")]
    PercentileRange(f64),
}
