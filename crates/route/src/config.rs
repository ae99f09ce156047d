use telemetry::{env_bool, env_f64, env_string, env_usize};

const KAKAO_DIRECTIONS_URL: &str = "https://apis-navi.kakaomobility.com/v1/directions";

#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub directions_url: String,
    pub api_key: String,
    /// Generate a local random walk when directions are unavailable.
    pub fallback_enabled: bool,
    pub fallback_points: usize,
    pub cruise_speed_kmh: f64,
}

impl RouteConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            directions_url: env_string("DIRECTIONS_URL", KAKAO_DIRECTIONS_URL),
            api_key: env_string("DIRECTIONS_API_KEY", ""),
            fallback_enabled: env_bool("ROUTE_FALLBACK", false),
            fallback_points: env_usize("FALLBACK_POINTS", 600),
            cruise_speed_kmh: env_f64("CRUISE_SPEED_KMH", 40.0),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
