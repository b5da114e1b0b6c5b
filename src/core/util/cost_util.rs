pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

pub struct CostUtil;

impl CostUtil {
    #[inline]
    pub fn bytes_to_gb(bytes: f64) -> f64 {
        bytes / BYTES_PER_GB
    }

    /// Spreads a rate quoted per `period_hours` over one hour.
    #[inline]
    pub fn hourly_rate(rate: f64, period_hours: f64) -> f64 {
        if period_hours <= 0.0 {
            return 0.0;
        }
        rate / period_hours
    }

    /// Cost of one hourly sample consuming `units` at `rate` per unit per period.
    #[inline]
    pub fn per_unit_hourly_cost(units: f64, rate: f64, period_hours: f64) -> f64 {
        units * Self::hourly_rate(rate, period_hours)
    }
}
