use crate::{reminder::deliver_due_reminders::DeliverDueRemindersUseCase, shared::usecase::execute};
use actix_web::rt::time::{interval, sleep_until, Instant};
use std::time::Duration;
use tickler_infra::TicklerContext;
use tracing::info;

/// Seconds until `secs_before_min` seconds before the next full minute
pub fn get_start_delay(now_ts: usize, secs_before_min: usize) -> usize {
    let secs_to_next_minute = 60 - (now_ts / 1000) % 60;
    if secs_to_next_minute > secs_before_min {
        secs_to_next_minute - secs_before_min
    } else {
        secs_to_next_minute + (60 - secs_before_min)
    }
}

pub fn start_deliver_reminders_job(ctx: TicklerContext) {
    actix_web::rt::spawn(async move {
        let now = ctx.sys.get_timestamp_millis();
        let secs_to_next_run = get_start_delay(now as usize, 0);
        let start = Instant::now() + Duration::from_secs(secs_to_next_run as u64);
        let period = Duration::from_secs(ctx.config.delivery_interval_secs.max(1));
        info!(
            "Delivering due reminders every {} seconds, starting in {} seconds",
            period.as_secs(),
            secs_to_next_run
        );

        sleep_until(start).await;
        let mut delivery_interval = interval(period);
        loop {
            delivery_interval.tick().await;
            let context = ctx.clone();
            actix_web::rt::spawn(async move {
                // Failures are logged by the use case and retried on the next tick
                let _ = execute(DeliverDueRemindersUseCase, &context).await;
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_delay_works() {
        assert_eq!(get_start_delay(50 * 1000, 5), 5);
        assert_eq!(get_start_delay(50 * 1000, 10), 60);
        assert_eq!(get_start_delay(50 * 1000, 15), 55);
        assert_eq!(get_start_delay(60 * 1000, 60), 60);
        assert_eq!(get_start_delay(60 * 1000, 10), 50);
        assert_eq!(get_start_delay(59 * 1000, 0), 1);
        assert_eq!(get_start_delay(59 * 1000, 1), 60);
    }
}
