pub mod dm;
pub mod hub;
pub mod notifier;
pub mod telemetry;

pub use dm::{DmDetail, DmEngine, DmError, DmHandle, NewDm, UpdateDm};
pub use hub::{BroadcastHub, Envelope, JoinError, Subscription};
pub use notifier::{Notifier, NotifyError};

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::atomic::{AtomicU64, Ordering};

    use chrono::Utc;
    use crewdeck_core::types::{Actor, Position};
    use crewdeck_storage::{Database, NewEmployee};

    static EMAIL_SEQ: AtomicU64 = AtomicU64::new(0);

    pub async fn setup_db() -> Database {
        let db = Database::connect("sqlite::memory:?cache=shared")
            .await
            .expect("connect");
        db.run_migrations().await.expect("migrations");
        db
    }

    pub async fn seed_actor(db: &Database, name: &str, position: Position) -> Actor {
        let seq = EMAIL_SEQ.fetch_add(1, Ordering::Relaxed);
        let email = format!("{name}-{seq}@crewdeck.test");
        let employee_id = db
            .employees()
            .insert(&NewEmployee {
                employee_name: name,
                email: &email,
                position,
                created_at: Utc::now(),
            })
            .await
            .expect("seed employee");
        Actor {
            employee_id,
            employee_name: name.to_string(),
            position,
        }
    }
}
