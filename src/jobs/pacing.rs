/*!
 * Pacing between the languages of one job.
 *
 * Rate-sensitive engines get throttled harder for jobs with many languages
 * or a lot of text. Pacing never affects results.
 */

use std::time::Duration;

use crate::app_config::PacingConfig;

/// Work estimate: document length in characters times language count
pub fn job_weight(document: &str, num_langs: usize) -> u64 {
    (document.chars().count() as u64).saturating_mul(num_langs as u64)
}

/// Delay to wait between two languages of a job.
///
/// Language tiers replace the base delay (highest matching tier wins);
/// weight tiers can only raise it.
pub fn delay_for_job(config: &PacingConfig, weight: u64, num_langs: usize) -> Duration {
    let mut delay_ms = config.base_delay_ms;

    for tier in &config.lang_tiers {
        if num_langs >= tier.threshold {
            delay_ms = tier.delay_ms;
        }
    }

    for tier in &config.weight_tiers {
        if weight >= tier.threshold as u64 {
            delay_ms = delay_ms.max(tier.delay_ms);
        }
    }

    Duration::from_millis(delay_ms)
}
