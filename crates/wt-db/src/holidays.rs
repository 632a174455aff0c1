//! Holiday reference data.

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use wt_core::Holiday;

use crate::{Database, DbError, format_date, parse_col};

pub(crate) fn load_holidays(conn: &Connection) -> Result<Vec<Holiday>, DbError> {
    let mut stmt = conn.prepare("SELECT date, name FROM holidays ORDER BY date ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Holiday {
            date: parse_col(row, 0)?,
            name: row.get(1)?,
        })
    })?;
    let mut holidays = Vec::new();
    for row in rows {
        holidays.push(row?);
    }
    Ok(holidays)
}

impl Database {
    /// Registers a holiday. Returns false if the date was already a holiday.
    pub fn add_holiday(&mut self, holiday: &Holiday) -> Result<bool, DbError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO holidays (date, name) VALUES (?, ?)",
            params![format_date(holiday.date), holiday.name],
        )?;
        if inserted > 0 {
            tracing::debug!(date = %holiday.date, name = %holiday.name, "holiday added");
            self.invalidate_calendar();
        }
        Ok(inserted > 0)
    }

    /// Removes the holiday on `date`. Returns false if there was none.
    pub fn remove_holiday(&mut self, date: NaiveDate) -> Result<bool, DbError> {
        let removed = self
            .conn
            .execute("DELETE FROM holidays WHERE date = ?", [format_date(date)])?;
        if removed > 0 {
            tracing::debug!(%date, "holiday removed");
            self.invalidate_calendar();
        }
        Ok(removed > 0)
    }

    /// Lists all holidays ordered by date.
    pub fn list_holidays(&self) -> Result<Vec<Holiday>, DbError> {
        load_holidays(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn holiday(date: NaiveDate, name: &str) -> Holiday {
        Holiday {
            date,
            name: name.to_string(),
        }
    }

    #[test]
    fn add_holiday_ignores_duplicate_dates() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(db.add_holiday(&holiday(date(2025, 12, 25), "Christmas")).unwrap());
        assert!(!db.add_holiday(&holiday(date(2025, 12, 25), "Again")).unwrap());

        let holidays = db.list_holidays().unwrap();
        assert_eq!(holidays, vec![holiday(date(2025, 12, 25), "Christmas")]);
    }

    #[test]
    fn calendar_cache_is_invalidated_on_change() {
        let mut db = Database::open_in_memory().unwrap();
        let tuesday = date(2025, 3, 4);
        assert!(db.calendar().unwrap().is_working_day(tuesday));

        db.add_holiday(&holiday(tuesday, "Founders Day")).unwrap();
        assert!(!db.calendar().unwrap().is_working_day(tuesday));

        assert!(db.remove_holiday(tuesday).unwrap());
        assert!(db.calendar().unwrap().is_working_day(tuesday));
        assert!(!db.remove_holiday(tuesday).unwrap());
    }
}
