//! End-of-run pass/fail rules over aggregated metrics.
//!
//! Thresholds use the familiar `metric{scenario:tag}` selector syntax paired with an expression
//! such as `p(95)<60` (milliseconds) or `rate<0.01`.
use crate::{
    percentile, RunSnapshot, ThresholdParseError, CHECKS, HTTP_REQ_DURATION, HTTP_REQ_FAILED,
    SCENARIO_TAG_KEY,
};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// Request latency, compared in milliseconds.
    RequestDuration,
    /// Fraction of requests that failed.
    RequestFailed,
    /// Fraction of checks that passed.
    Checks,
}

impl Metric {
    fn name(&self) -> &'static str {
        match self {
            Metric::RequestDuration => HTTP_REQ_DURATION,
            Metric::RequestFailed => HTTP_REQ_FAILED,
            Metric::Checks => CHECKS,
        }
    }

    fn is_trend(&self) -> bool {
        matches!(self, Metric::RequestDuration)
    }
}

impl FromStr for Metric {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            HTTP_REQ_DURATION => Ok(Metric::RequestDuration),
            HTTP_REQ_FAILED => Ok(Metric::RequestFailed),
            CHECKS => Ok(Metric::Checks),
            other => Err(ThresholdParseError::UnknownMetric(other.to_string())),
        }
    }
}

/// A metric optionally scoped to one scenario tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricSelector {
    pub metric: Metric,
    pub tag: Option<String>,
}

impl FromStr for MetricSelector {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((name, rest)) = s.split_once('{') else {
            return Ok(Self {
                metric: s.parse()?,
                tag: None,
            });
        };

        let inner = rest
            .strip_suffix('}')
            .ok_or_else(|| ThresholdParseError::MalformedSelector(s.to_string()))?;
        let (key, value) = inner
            .split_once(':')
            .ok_or_else(|| ThresholdParseError::MalformedSelector(s.to_string()))?;
        let (key, value) = (key.trim(), value.trim());

        if key != SCENARIO_TAG_KEY {
            return Err(ThresholdParseError::UnsupportedTag(key.to_string()));
        }
        if value.is_empty() {
            return Err(ThresholdParseError::MalformedSelector(s.to_string()));
        }

        Ok(Self {
            metric: name.trim().parse()?,
            tag: Some(value.to_string()),
        })
    }
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}{{{SCENARIO_TAG_KEY}:{tag}}}", self.metric.name()),
            None => write!(f, "{}", self.metric.name()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Aggregation {
    Percentile(f64),
    Avg,
    Med,
    Min,
    Max,
    Rate,
}

impl FromStr for Aggregation {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg" => Ok(Aggregation::Avg),
            "med" => Ok(Aggregation::Med),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "rate" => Ok(Aggregation::Rate),
            p if p.starts_with("p(") && p.ends_with(')') => {
                let value: f64 = p[2..p.len() - 1]
                    .trim()
                    .parse()
                    .map_err(|_| ThresholdParseError::UnknownAggregation(p.to_string()))?;
                if !(0. ..=100.).contains(&value) {
                    return Err(ThresholdParseError::PercentileRange(value));
                }
                Ok(Aggregation::Percentile(value))
            }
            other => Err(ThresholdParseError::UnknownAggregation(other.to_string())),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Percentile(p) => write!(f, "p({p})"),
            Aggregation::Avg => write!(f, "avg"),
            Aggregation::Med => write!(f, "med"),
            Aggregation::Min => write!(f, "min"),
            Aggregation::Max => write!(f, "max"),
            Aggregation::Rate => write!(f, "rate"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }

    pub fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
            Comparison::Gt => observed > bound,
            Comparison::Ge => observed >= bound,
            Comparison::Eq => observed == bound,
            Comparison::Ne => observed != bound,
        }
    }
}

/// The right-hand side of a threshold, e.g. `p(95)<60`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub bound: f64,
}

impl FromStr for ThresholdExpr {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Two-character operators must be tried first.
        const OPERATORS: [(&str, Comparison); 6] = [
            ("<=", Comparison::Le),
            (">=", Comparison::Ge),
            ("==", Comparison::Eq),
            ("!=", Comparison::Ne),
            ("<", Comparison::Lt),
            (">", Comparison::Gt),
        ];

        let (lhs, comparison, rhs) = OPERATORS
            .iter()
            .find_map(|(symbol, cmp)| {
                s.split_once(symbol)
                    .map(|(lhs, rhs)| (lhs.trim(), *cmp, rhs.trim()))
            })
            .ok_or_else(|| ThresholdParseError::MalformedExpression(s.to_string()))?;

        let bound: f64 = rhs
            .parse()
            .map_err(|_| ThresholdParseError::MalformedExpression(s.to_string()))?;

        Ok(Self {
            aggregation: lhs.parse()?,
            comparison,
            bound,
        })
    }
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.aggregation,
            self.comparison.symbol(),
            self.bound
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Threshold {
    pub selector: MetricSelector,
    pub expr: ThresholdExpr,
}

impl Threshold {
    /// Parse a threshold from a selector such as `http_req_duration{scenario:read}` and an
    /// expression such as `p(95)<60`.
    pub fn parse(selector: &str, expr: &str) -> Result<Self, ThresholdParseError> {
        let selector: MetricSelector = selector.parse()?;
        let expr: ThresholdExpr = expr.parse()?;

        let applies = match expr.aggregation {
            Aggregation::Rate => !selector.metric.is_trend(),
            _ => selector.metric.is_trend(),
        };
        if !applies {
            return Err(ThresholdParseError::Inapplicable {
                metric: selector.metric.name().to_string(),
                aggregation: expr.aggregation.to_string(),
            });
        }

        Ok(Self { selector, expr })
    }

    /// Evaluate against the samples of a finished run.
    ///
    /// A threshold over a metric that recorded no samples is reported as passing with no
    /// observed value.
    pub fn evaluate(&self, snapshot: &RunSnapshot) -> ThresholdOutcome {
        let observed = self.observe(snapshot);
        let passed = match observed {
            Some(value) => self.expr.comparison.holds(value, self.expr.bound),
            None => {
                warn!("Threshold {self} has no samples to evaluate.");
                true
            }
        };
        debug!("Threshold {self}: observed={observed:?}, passed={passed}");

        ThresholdOutcome {
            threshold: self.to_string(),
            observed,
            passed,
        }
    }

    fn observe(&self, snapshot: &RunSnapshot) -> Option<f64> {
        let tag = self.selector.tag.as_deref();
        match self.selector.metric {
            Metric::RequestDuration => {
                let latencies = snapshot.latencies(tag);
                aggregate_ms(&latencies, self.expr.aggregation)
            }
            Metric::RequestFailed => snapshot.failure_rate(tag),
            Metric::Checks => snapshot.check_pass_rate(),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.selector, self.expr)
    }
}

fn aggregate_ms(sorted: &[Duration], aggregation: Aggregation) -> Option<f64> {
    let value = match aggregation {
        Aggregation::Percentile(p) => percentile(sorted, p)?,
        Aggregation::Med => percentile(sorted, 50.)?,
        Aggregation::Min => *sorted.first()?,
        Aggregation::Max => *sorted.last()?,
        Aggregation::Avg => {
            if sorted.is_empty() {
                return None;
            }
            let total: u128 = sorted.iter().map(Duration::as_nanos).sum();
            return Some(total as f64 / sorted.len() as f64 / 1e6);
        }
        Aggregation::Rate => return None,
    };
    Some(as_millis_f64(value))
}

fn as_millis_f64(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1e6
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdOutcome {
    pub threshold: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

impl fmt::Display for ThresholdOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "✓" } else { "✗" };
        match self.observed {
            Some(value) => write!(f, "{mark} {} (observed {value:.4})", self.threshold),
            None => write!(f, "{mark} {} (no samples)", self.threshold),
        }
    }
}

/// A run passes only if every threshold passes.
pub fn verdict(outcomes: &[ThresholdOutcome]) -> bool {
    outcomes.iter().all(|o| o.passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CheckSummary, SeriesSnapshot};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn snapshot_with(tag: &str, latencies: Vec<Duration>, error: u64) -> RunSnapshot {
        let success = latencies.len() as u64 - error;
        RunSnapshot {
            series: vec![SeriesSnapshot::new(tag, latencies, success, error)],
            checks: vec![],
        }
    }

    #[test]
    fn parses_tagged_selector() {
        let selector: MetricSelector = "http_req_duration{scenario:read}".parse().unwrap();
        assert_eq!(selector.metric, Metric::RequestDuration);
        assert_eq!(selector.tag.as_deref(), Some("read"));
        assert_eq!(selector.to_string(), "http_req_duration{scenario:read}");
    }

    #[test]
    fn rejects_unknown_tag_key() {
        assert_eq!(
            "http_req_duration{method:GET}".parse::<MetricSelector>(),
            Err(ThresholdParseError::UnsupportedTag("method".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_metric() {
        assert_eq!(
            "iteration_duration".parse::<MetricSelector>(),
            Err(ThresholdParseError::UnknownMetric(
                "iteration_duration".to_string()
            ))
        );
    }

    #[test]
    fn parses_expressions() {
        let expr: ThresholdExpr = "p(95)<60".parse().unwrap();
        assert_eq!(expr.aggregation, Aggregation::Percentile(95.));
        assert_eq!(expr.comparison, Comparison::Lt);
        assert_eq!(expr.bound, 60.);

        let expr: ThresholdExpr = "rate <= 0.01".parse().unwrap();
        assert_eq!(expr.aggregation, Aggregation::Rate);
        assert_eq!(expr.comparison, Comparison::Le);

        let expr: ThresholdExpr = "p(99.9)>=5".parse().unwrap();
        assert_eq!(expr.aggregation, Aggregation::Percentile(99.9));
        assert_eq!(expr.comparison, Comparison::Ge);
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!("p(95)60".parse::<ThresholdExpr>().is_err());
        assert!("p(95)<fast".parse::<ThresholdExpr>().is_err());
        assert_eq!(
            "p(150)<1".parse::<ThresholdExpr>(),
            Err(ThresholdParseError::PercentileRange(150.))
        );
    }

    #[test]
    fn rejects_rate_on_durations() {
        assert!(matches!(
            Threshold::parse("http_req_duration", "rate<0.01"),
            Err(ThresholdParseError::Inapplicable { .. })
        ));
        assert!(matches!(
            Threshold::parse("http_req_failed", "p(95)<0.01"),
            Err(ThresholdParseError::Inapplicable { .. })
        ));
    }

    #[test]
    fn p95_is_checked_on_the_percentile_value() {
        // 96% of samples sit exactly at the bound: the pass rate is above 95%, but the 95th
        // percentile value equals 60ms, which is not strictly below 60ms.
        let mut latencies = vec![ms(60); 96];
        latencies.extend(vec![ms(200); 4]);
        let snapshot = snapshot_with("read", latencies, 0);

        let threshold = Threshold::parse("http_req_duration{scenario:read}", "p(95)<60").unwrap();
        let outcome = threshold.evaluate(&snapshot);

        assert_eq!(outcome.observed, Some(60.));
        assert!(!outcome.passed);
    }

    #[test]
    fn p95_passes_below_bound() {
        let mut latencies = vec![ms(59); 96];
        latencies.extend(vec![ms(200); 4]);
        let snapshot = snapshot_with("read", latencies, 0);

        let threshold = Threshold::parse("http_req_duration{scenario:read}", "p(95)<60").unwrap();
        assert!(threshold.evaluate(&snapshot).passed);
    }

    #[test]
    fn tag_scoping_ignores_other_scenarios() {
        let snapshot = RunSnapshot {
            series: vec![
                SeriesSnapshot::new("read", vec![ms(10); 10], 10, 0),
                SeriesSnapshot::new("write", vec![ms(500); 10], 10, 0),
            ],
            checks: vec![],
        };

        let read = Threshold::parse("http_req_duration{scenario:read}", "p(95)<60").unwrap();
        let write = Threshold::parse("http_req_duration{scenario:write}", "p(95)<120").unwrap();
        let all = Threshold::parse("http_req_duration", "max<100").unwrap();

        assert!(read.evaluate(&snapshot).passed);
        assert!(!write.evaluate(&snapshot).passed);
        assert!(!all.evaluate(&snapshot).passed);
    }

    #[test]
    fn failure_rate_threshold() {
        let snapshot = RunSnapshot {
            series: vec![
                SeriesSnapshot::new("read", vec![], 990, 10),
                SeriesSnapshot::new("write", vec![], 1000, 0),
            ],
            checks: vec![],
        };

        let threshold = Threshold::parse("http_req_failed", "rate<0.01").unwrap();
        let outcome = threshold.evaluate(&snapshot);
        assert_eq!(outcome.observed, Some(0.005));
        assert!(outcome.passed);

        let scoped = Threshold::parse("http_req_failed{scenario:read}", "rate<0.01").unwrap();
        assert!(!scoped.evaluate(&snapshot).passed);
    }

    #[test]
    fn checks_threshold() {
        let snapshot = RunSnapshot {
            series: vec![],
            checks: vec![CheckSummary {
                name: "detail 200".to_string(),
                passes: 99,
                fails: 1,
            }],
        };
        let threshold = Threshold::parse("checks", "rate>0.95").unwrap();
        assert!(threshold.evaluate(&snapshot).passed);
    }

    #[tracing_test::traced_test]
    #[test]
    fn no_samples_passes() {
        let threshold = Threshold::parse("http_req_duration{scenario:read}", "p(95)<60").unwrap();
        let outcome = threshold.evaluate(&RunSnapshot::default());
        assert_eq!(outcome.observed, None);
        assert!(outcome.passed);
        assert!(logs_contain("has no samples to evaluate"));
    }

    #[test]
    fn verdict_is_conjunction() {
        let pass = ThresholdOutcome {
            threshold: "a".to_string(),
            observed: Some(1.),
            passed: true,
        };
        let fail = ThresholdOutcome {
            threshold: "b".to_string(),
            observed: Some(1.),
            passed: false,
        };

        assert!(verdict(&[pass.clone(), pass.clone()]));
        assert!(!verdict(&[pass.clone(), fail, pass]));
        assert!(verdict(&[]));
    }

    #[test]
    fn avg_and_extremes() {
        let latencies = vec![ms(10), ms(20), ms(30), ms(40)];
        assert_eq!(aggregate_ms(&latencies, Aggregation::Avg), Some(25.));
        assert_eq!(aggregate_ms(&latencies, Aggregation::Min), Some(10.));
        assert_eq!(aggregate_ms(&latencies, Aggregation::Max), Some(40.));
        assert_eq!(aggregate_ms(&latencies, Aggregation::Med), Some(25.));
    }
}
