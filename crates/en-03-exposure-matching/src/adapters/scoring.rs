//! Default risk engine.
//!
//! Sums scan durations over all windows, rounds up to whole minutes and then
//! to a multiple of `bucket_minutes`. The score weights each scan's duration
//! by its attenuation bucket and multiplies by the key's transmission risk
//! level.

use shared_types::{DiagnosisKey, ExposureWindow, ScanInstance};

use crate::domain::TracingParams;
use crate::ports::outbound::{RiskAssessment, RiskScorer};

#[derive(Debug, Clone, Default)]
pub struct BucketizedRiskScorer {
    params: TracingParams,
}

impl BucketizedRiskScorer {
    pub fn new(params: TracingParams) -> Self {
        Self { params }
    }

    fn weight_percent(&self, scan: &ScanInstance) -> u64 {
        let [near, medium] = self.params.attenuation_thresholds_db;
        let [immediate_w, near_w, other_w] = self.params.attenuation_weights_percent;
        let weight = if scan.min_attenuation_db <= near {
            immediate_w
        } else if scan.min_attenuation_db <= medium {
            near_w
        } else {
            other_w
        };
        u64::from(weight)
    }
}

impl RiskScorer for BucketizedRiskScorer {
    fn score(&self, key: &DiagnosisKey, windows: &[ExposureWindow]) -> Option<RiskAssessment> {
        let scans = windows.iter().flat_map(|w| w.scan_instances.iter());

        let mut total_seconds = 0u64;
        let mut weighted_seconds = 0u64;
        for scan in scans {
            let seconds = u64::from(scan.seconds_since_last_scan);
            total_seconds += seconds;
            weighted_seconds += seconds * self.weight_percent(scan);
        }

        let bucket = u64::from(self.params.bucket_minutes.max(1));
        let minutes = total_seconds.div_ceil(60);
        let bucketized = minutes.div_ceil(bucket) * bucket;
        if bucketized == 0 || bucketized < u64::from(self.params.min_exposure_bucketized_minutes) {
            return None;
        }

        let weighted_minutes = (weighted_seconds / 100).div_ceil(60);
        let risk_level = key.transmission_risk_level().max(1) as u64;
        Some(RiskAssessment {
            exposure_minutes: u32::try_from(bucketized).unwrap_or(u32::MAX),
            risk_score: u32::try_from(weighted_minutes * risk_level).unwrap_or(u32::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{CalibrationConfidence, DayNumber, ReportType};

    fn window(scans: &[(i32, u32)]) -> ExposureWindow {
        ExposureWindow {
            day_number: DayNumber(1),
            report_type: ReportType::ConfirmedTest,
            calibration_confidence: CalibrationConfidence::Medium,
            start_epoch_seconds: 0,
            end_epoch_seconds: 0,
            first_interval_number: 0,
            last_interval_number: 0,
            scan_instances: scans
                .iter()
                .map(|&(attenuation, seconds)| ScanInstance {
                    min_attenuation_db: attenuation,
                    typical_attenuation_db: attenuation,
                    seconds_since_last_scan: seconds,
                })
                .collect(),
        }
    }

    #[test]
    fn test_single_default_scan_qualifies() {
        let scorer = BucketizedRiskScorer::default();
        let key = DiagnosisKey::new(vec![0; 16], 0, 144);

        let assessment = scorer.score(&key, &[window(&[(50, 300)])]).unwrap();
        assert_eq!(assessment.exposure_minutes, 5);
        assert_eq!(assessment.risk_score, 5);
    }

    #[test]
    fn test_short_exposure_rejected() {
        let scorer = BucketizedRiskScorer::default();
        let key = DiagnosisKey::new(vec![0; 16], 0, 144);
        assert!(scorer.score(&key, &[window(&[(50, 60)])]).is_some(), "1 minute buckets up to 5");

        let strict = BucketizedRiskScorer::new(TracingParams {
            min_exposure_bucketized_minutes: 10,
            ..TracingParams::default()
        });
        assert!(strict.score(&key, &[window(&[(50, 300)])]).is_none());
        assert!(scorer.score(&key, &[]).is_none(), "No scans, no exposure");
    }

    #[test]
    fn test_attenuation_weights_and_risk_level() {
        let scorer = BucketizedRiskScorer::default();
        let key = DiagnosisKey::new(vec![0; 16], 0, 144).with_transmission_risk_level(3);

        let assessment = scorer
            .score(&key, &[window(&[(50, 600), (60, 600), (80, 600)])])
            .unwrap();
        assert_eq!(assessment.exposure_minutes, 30);
        // 10 min at 100% + 10 min at 50% + 10 min at 0% = 15 min, times 3
        assert_eq!(assessment.risk_score, 45);
    }
}
