//! Holiday calendar management.

use std::io::Write;

use anyhow::{Result, bail};
use wt_core::Holiday;
use wt_db::Database;

use super::util::write_json;
use crate::HolidayAction;

pub fn run<W: Write>(writer: &mut W, db: &mut Database, action: HolidayAction) -> Result<()> {
    match action {
        HolidayAction::Add { date, name } => {
            let holiday = Holiday { date, name };
            if db.add_holiday(&holiday)? {
                writeln!(writer, "Added holiday {}: {}", holiday.date, holiday.name)?;
            } else {
                writeln!(writer, "A holiday on {date} already exists.")?;
            }
        }
        HolidayAction::Remove { date } => {
            if !db.remove_holiday(date)? {
                bail!("no holiday on {date}");
            }
            writeln!(writer, "Removed holiday {date}.")?;
        }
        HolidayAction::List { json } => {
            let holidays = db.list_holidays()?;
            if json {
                return write_json(writer, &holidays);
            }
            if holidays.is_empty() {
                writeln!(writer, "No holidays registered.")?;
            }
            for holiday in holidays {
                writeln!(writer, "{}  {}", holiday.date, holiday.name)?;
            }
        }
    }
    Ok(())
}
