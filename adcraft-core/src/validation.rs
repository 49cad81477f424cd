//! Zone Validation - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy decides whether a bad zone is clamped into the image or rejected.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::{NormRect, SafeZones, Zone};

/// Slack allowed past the image edge before a zone counts as out of bounds.
pub const ZONE_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub zone_id: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    fn summary(&self) -> String {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
            .map(|v| format!("zone {}: {}", v.zone_id, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// What to do with zones that fail an error-level rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZonePolicy {
    /// Pull the zone back inside the image and keep going.
    #[default]
    Clamp,
    Reject,
}

impl std::str::FromStr for ZonePolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clamp" => Ok(ZonePolicy::Clamp),
            "reject" => Ok(ZonePolicy::Reject),
            other => Err(EngineError::Configuration(format!("unknown zone policy '{}'", other))),
        }
    }
}

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, zone: &Zone, zones: &SafeZones) -> Vec<ValidationViolation>;
}

fn violation(
    rule: &dyn ValidationRule,
    zone: &Zone,
    severity: ViolationSeverity,
    message: &str,
) -> ValidationViolation {
    let r = zone.rect;
    ValidationViolation {
        rule: rule.name().to_string(),
        zone_id: zone.id.clone(),
        severity,
        message: message.to_string(),
        actual: Some(format!("x={} y={} w={} h={}", r.x, r.y, r.w, r.h)),
    }
}

// --- Concrete Rules ---

pub struct BoundsRule;

impl ValidationRule for BoundsRule {
    fn name(&self) -> &'static str { "bounds" }

    fn validate(&self, zone: &Zone, _zones: &SafeZones) -> Vec<ValidationViolation> {
        let r = zone.rect;
        if !is_finite(&r) {
            return vec![violation(self, zone, ViolationSeverity::Error, "zone has non-finite coordinates")];
        }
        let limit = 1.0 + ZONE_EPSILON;
        if r.x < 0.0 || r.y < 0.0 || r.x + r.w > limit || r.y + r.h > limit {
            vec![violation(self, zone, ViolationSeverity::Error, "zone extends outside the image")]
        } else {
            vec![]
        }
    }
}

pub struct PositiveSizeRule;

impl ValidationRule for PositiveSizeRule {
    fn name(&self) -> &'static str { "positive_size" }

    fn validate(&self, zone: &Zone, _zones: &SafeZones) -> Vec<ValidationViolation> {
        if zone.rect.w > 0.0 && zone.rect.h > 0.0 {
            vec![]
        } else {
            vec![violation(self, zone, ViolationSeverity::Error, "zone has no area")]
        }
    }
}

/// Overlapping an avoid region is allowed but worth surfacing.
pub struct AvoidRegionRule;

impl ValidationRule for AvoidRegionRule {
    fn name(&self) -> &'static str { "avoid_region" }

    fn validate(&self, zone: &Zone, zones: &SafeZones) -> Vec<ValidationViolation> {
        if zones.avoid_regions.iter().any(|a| a.intersects(&zone.rect)) {
            vec![violation(self, zone, ViolationSeverity::Warning, "zone overlaps an avoid region")]
        } else {
            vec![]
        }
    }
}

fn is_finite(r: &NormRect) -> bool {
    [r.x, r.y, r.w, r.h].iter().all(|v| v.is_finite())
}

/// Clamp a rectangle into the unit square. Zero-area input stays zero-area,
/// and a rectangle with a NaN or infinite component collapses to zero area.
pub fn clamp_zone(rect: NormRect) -> NormRect {
    if !is_finite(&rect) {
        return NormRect { x: 0.0, y: 0.0, w: 0.0, h: 0.0 };
    }
    let x = rect.x.clamp(0.0, 1.0);
    let y = rect.y.clamp(0.0, 1.0);
    NormRect {
        x,
        y,
        w: rect.w.clamp(0.0, 1.0 - x),
        h: rect.h.clamp(0.0, 1.0 - y),
    }
}

/// Validator orchestrates rules and applies the zone policy.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
    policy: ZonePolicy,
}

impl Validator {
    pub fn new(policy: ZonePolicy) -> Self {
        Self {
            rules: vec![
                Box::new(BoundsRule),
                Box::new(PositiveSizeRule),
                Box::new(AvoidRegionRule),
            ],
            policy,
        }
    }

    pub fn validate(&self, zones: &SafeZones) -> ValidationResult {
        let violations: Vec<_> = zones
            .zones
            .iter()
            .flat_map(|zone| self.rules.iter().flat_map(move |rule| rule.validate(zone, zones)))
            .collect();
        ValidationResult {
            valid: !violations.iter().any(|v| v.severity == ViolationSeverity::Error),
            violations,
        }
    }

    /// Apply the policy. Under `Clamp` out-of-bounds zones are pulled in and
    /// zones left without area are dropped; under `Reject` any error fails.
    pub fn enforce(&self, mut zones: SafeZones) -> EngineResult<SafeZones> {
        let result = self.validate(&zones);
        for warning in result.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning) {
            tracing::debug!(zone = %warning.zone_id, rule = %warning.rule, "{}", warning.message);
        }
        if !result.has_errors() {
            return Ok(zones);
        }
        match self.policy {
            ZonePolicy::Reject => Err(EngineError::Validation(result.summary())),
            ZonePolicy::Clamp => {
                tracing::warn!(image = %zones.image_id, problems = %result.summary(), "clamping safe zones");
                for zone in &mut zones.zones {
                    zone.rect = clamp_zone(zone.rect);
                }
                zones.zones.retain(|z| z.rect.w > 0.0 && z.rect.h > 0.0);
                if zones.zones.is_empty() {
                    return Err(EngineError::Validation(format!(
                        "no usable safe zones for image {}",
                        zones.image_id
                    )));
                }
                Ok(zones)
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ZonePolicy::default())
    }
}
