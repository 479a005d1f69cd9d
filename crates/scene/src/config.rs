use foundation::math::GeoPoint;

/// Everything the globe scene needs that is not derived from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeConfig {
    pub earth_radius: f64,
    /// Prefix joined with each texture file name.
    pub texture_base_url: String,
    pub reference_location: GeoPoint,
    pub reference_color: u32,
    pub reference_label: String,
    pub live_color: u32,
    pub live_label: String,
    /// Where a click on the reference marker navigates.
    pub navigation_target: String,
    /// Added to the time-of-day angle so the lit side matches UTC.
    pub degree_offset: f64,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            earth_radius: 80.0,
            texture_base_url: "https://s3-us-west-2.amazonaws.com/s.cdpn.io/123879/".to_string(),
            reference_location: GeoPoint::new(20.5937, 78.9629),
            reference_color: 0xff9933,
            reference_label: "India".to_string(),
            live_color: 0x3399ff,
            live_label: "UserLocation".to_string(),
            navigation_target: "weather.html".to_string(),
            degree_offset: 90.0,
        }
    }
}

impl GlobeConfig {
    pub fn texture_url(&self, file: &str) -> String {
        format!("{}{}", self.texture_base_url, file)
    }
}
