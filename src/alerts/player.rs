//! Plays due alerts through an external command.

use std::time::Duration;

use log::{error, info, warn};
use tokio::{process::Command, time};

use crate::{alerts::alert::PrayerAlert, time_format::current_time};

/// Placeholder replaced by the prayer name in command arguments.
const PRAYER_PLACEHOLDER: &str = "{prayer}";

/// Runs the configured alert command with bounded retries.
///
/// An empty command only logs the alert.
#[derive(Debug, Clone)]
pub struct AlertPlayer {
    command: Vec<String>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl AlertPlayer {
    pub fn new(command: Vec<String>, max_attempts: u32, retry_delay: Duration) -> Self {
        AlertPlayer {
            command,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Plays `alert`, returns whether an attempt succeeded.
    pub async fn play(&self, alert: &PrayerAlert) -> bool {
        let Some((program, args)) = self.command.split_first() else {
            info!("{} (no alert command configured)", alert);
            return true;
        };

        let prayer = alert.prayer.to_string();
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.replace(PRAYER_PLACEHOLDER, &prayer))
            .collect();

        for attempt in 1..=self.max_attempts {
            match Command::new(program).args(&args).status().await {
                Ok(status) if status.success() => {
                    info!("played alert for {} at {}", alert, current_time());
                    return true;
                }
                Ok(status) => warn!(
                    "alert command exited with {} (attempt {}/{})",
                    status, attempt, self.max_attempts
                ),
                Err(e) => warn!(
                    "failed to run alert command {}: {} (attempt {}/{})",
                    program, e, attempt, self.max_attempts
                ),
            }

            if attempt < self.max_attempts {
                time::sleep(self.retry_delay).await;
            }
        }

        error!("giving up on alert for {}", alert);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayers::PrayerName;
    use chrono::NaiveDate;

    fn alert() -> PrayerAlert {
        PrayerAlert {
            prayer: PrayerName::Isha,
            time: "22:30".to_owned(),
            date: NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
        }
    }

    fn player(command: &[&str]) -> AlertPlayer {
        AlertPlayer::new(
            command.iter().map(|part| part.to_string()).collect(),
            3,
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_without_command_only_logs() {
        assert!(player(&[]).play(&alert()).await);
    }

    #[tokio::test]
    async fn test_successful_command() {
        assert!(player(&["true"]).play(&alert()).await);
    }

    #[tokio::test]
    async fn test_failing_command_gives_up() {
        assert!(!player(&["false"]).play(&alert()).await);
        assert!(!player(&["minbar-no-such-player"]).play(&alert()).await);
    }

    #[tokio::test]
    async fn test_prayer_placeholder() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("{prayer}.played");

        let played = player(&["touch", target.to_str().unwrap()])
            .play(&alert())
            .await;

        assert!(played);
        assert!(dir.path().join("Isha.played").exists());
    }
}
