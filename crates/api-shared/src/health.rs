use crate::messages::HealthRes;

/// Simple health service shared by the HTTP server and any future API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Check health without creating an instance.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "rxtrack is alive".into(),
        }
    }
}
