//! Operating mode selection from command line arguments.
pub enum ServiceMode {
    /// Long-running consumer over `inboundQueue` (the default).
    Serve,
    /// One-shot: flip non-complete, Failed requests back to Pending and
    /// republish a fresh `RaceRequested` for each.
    Replay,
}

impl ServiceMode {
    pub fn from_args() -> Self {
        std::env::args()
            .find_map(|a| match a.as_str() {
                "--replay" => Some(Self::Replay),
                "--serve" => Some(Self::Serve),
                _ => None,
            })
            .unwrap_or(Self::Serve)
    }
}
