//! `flowcast forecast`: print the multi-day congestion outlook.

use chrono::Local;
use flowcast::traffic::{
    build_forecast, CongestionSampler, DayPeriod, TrafficPrediction, DEFAULT_FORECAST_DAYS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::common::congestion_marker;
use crate::error::CliError;

pub struct ForecastArgs {
    pub days: Option<usize>,
    pub seed: Option<u64>,
}

pub fn run(args: ForecastArgs) -> Result<(), CliError> {
    let days = args.days.unwrap_or(DEFAULT_FORECAST_DAYS);
    if days == 0 {
        return Err(CliError::Config("--days must be at least 1".to_string()));
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let predictions = build_forecast(
        Local::now().date_naive(),
        days,
        &CongestionSampler::default(),
        &mut rng,
    );

    print!("{}", render_table(&predictions));
    Ok(())
}

fn render_table(predictions: &[TrafficPrediction]) -> String {
    let mut out = format!("{:<12}", "Day");
    for period in DayPeriod::ALL {
        out.push_str(&format!("{:<12}", period.label()));
    }
    out.push('\n');

    for prediction in predictions {
        out.push_str(&format!("{:<12}", prediction.day_name));
        for period in DayPeriod::ALL {
            let level = prediction.level(period);
            out.push_str(&format!(
                "{:<12}",
                format!("{} {}", congestion_marker(level), level.label())
            ));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use flowcast::traffic::CongestionLevel;

    #[test]
    fn test_render_table_has_row_per_day() {
        let predictions = vec![TrafficPrediction {
            day_name: "Today".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            morning: CongestionLevel::Low,
            afternoon: CongestionLevel::Moderate,
            evening: CongestionLevel::Heavy,
        }];
        let table = render_table(&predictions);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Day"));
        assert!(lines[1].starts_with("Today"));
        assert!(lines[1].contains("Heavy"));
    }
}
