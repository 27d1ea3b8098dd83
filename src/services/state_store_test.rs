#[cfg(test)]
mod state_store_tests {
    use chrono::{TimeZone, Utc};
    use std::fs;
    use tempfile::tempdir;

    use crate::models::slot::{DaySlotStatus, Snapshot};
    use crate::services::state_store::StateStore;

    fn open(equipment: &str, date: &str, time: &str) -> DaySlotStatus {
        DaySlotStatus {
            equipment: equipment.to_string(),
            date: date.to_string(),
            last_time: time.to_string(),
            last_available: true,
        }
    }

    #[test]
    fn test_missing_file_is_first_run() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("previous-state.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_file_is_first_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("previous-state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = StateStore::new(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("previous-state.json"));

        let captured_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::from_statuses(
            vec![
                open("Vinyl Cutter", "Tuesday, March 3, 2026", "8:00pm"),
                open("Laser Cutter", "Monday, March 2, 2026", "11:00pm"),
            ],
            captured_at,
        );

        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("previous-state.json"));

        let first = Snapshot::from_statuses(
            vec![open("Laser Cutter", "Monday, March 2, 2026", "11:00pm")],
            Utc::now(),
        );
        let second = Snapshot::from_statuses(
            vec![open("Vinyl Cutter", "Tuesday, March 3, 2026", "8:00pm")],
            Utc::now(),
        );

        store.save(&first).unwrap();
        store.save(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.slots[0].equipment, "Vinyl Cutter");
    }

    #[test]
    fn test_persisted_document_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("previous-state.json");
        let store = StateStore::new(&path);

        let snapshot = Snapshot::from_statuses(
            vec![open("Laser Cutter", "Monday, March 2, 2026", "11:00pm")],
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        );
        store.save(&snapshot).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["slots"][0]["equipment"], "Laser Cutter");
        assert_eq!(json["slots"][0]["date"], "Monday, March 2, 2026");
        assert_eq!(json["slots"][0]["time"], "11:00pm");
        assert_eq!(json["slots"][0]["available"], true);
        assert!(json["lastChecked"].as_str().unwrap().starts_with("2026-03-01T12:00:00"));
    }

    #[test]
    fn test_loads_legacy_array_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("previous-state.json");
        fs::write(
            &path,
            r#"[
                {
                    "equipment": "Laser Cutter",
                    "date": "Tuesday, January 13, 2026",
                    "dateTime": "7:00pm Tuesday, January 13, 2026"
                }
            ]"#,
        )
        .unwrap();

        let store = StateStore::new(&path);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.slots[0].equipment, "Laser Cutter");
        assert_eq!(loaded.slots[0].last_time, "7:00pm");
        assert!(loaded.slots[0].last_available);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempdir().unwrap();
        // Parent directory does not exist
        let store = StateStore::new(dir.path().join("missing").join("previous-state.json"));

        let snapshot = Snapshot::from_statuses(Vec::new(), Utc::now());
        assert!(store.save(&snapshot).is_err());
        assert!(store.load().is_none());
    }
}
