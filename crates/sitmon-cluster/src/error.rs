#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("store error")]
    Store(#[from] sitmon_store::Error),
    /// `cluster_not_found`: a programming bug, not a data condition — an incident we just
    /// matched or created vanished before we could re-read it within the same transaction.
    /// Fatal for the work unit only; the caller logs and moves on, never panics.
    #[error("incident {incident_id} not found after match")]
    IncidentMissing { incident_id: String },
}

pub type Result<T> = std::result::Result<T, ClusterError>;
