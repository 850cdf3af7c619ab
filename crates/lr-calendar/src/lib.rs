//! Booking log for the reservation bot.
//!
//! Confirmed bookings are kept in an iCalendar file so they show up in any
//! calendar application. The file is read once when the store is opened and
//! rewritten in full on flush.
//!
//! # Single instance
//!
//! A [`CalendarStore`] holds an exclusive lock on `<file>.lock` for its whole
//! lifetime. A second process opening the same calendar fails with
//! [`CalendarError::Locked`] instead of racing on the rewrite.
//!
//! # Flushing
//!
//! Pending events are written by [`CalendarStore::flush`] or
//! [`CalendarStore::close`]. [`CalendarStore::scoped`] closes the store on
//! every exit path of its closure; dropping a store with unflushed events
//! also attempts a final write. A store with nothing appended never rewrites
//! the file.
//!
//! # Deduplication
//!
//! The store never deduplicates. [`CalendarStore::booking_for_slot`] lets
//! callers check for an existing booking before they create a new one.

mod ics;

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use fs2::FileExt;
use lr_core::{CalendarEvent, TimeSlot};
use thiserror::Error;

pub use ics::ParseError;

/// Calendar store errors.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The calendar file does not exist.
    #[error("calendar file {} not found (create it with `lr init`)", path.display())]
    NotFound { path: PathBuf },
    /// The calendar file already exists.
    #[error("calendar file {} already exists", path.display())]
    AlreadyExists { path: PathBuf },
    /// Another process holds the calendar.
    #[error("calendar {} is in use by another process", path.display())]
    Locked { path: PathBuf },
    /// Reading or writing the file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file is not a readable iCalendar document.
    #[error("invalid calendar {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl CalendarError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File-backed, append-only set of booking events.
///
/// See the [crate documentation](crate) for locking and flush guarantees.
#[derive(Debug)]
pub struct CalendarStore {
    path: PathBuf,
    doc: ics::Document,
    dirty: bool,
    _lock: File,
}

impl CalendarStore {
    /// Creates an empty calendar file. Fails if the file already exists.
    pub fn create(path: &Path) -> Result<(), CalendarError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| CalendarError::io(parent, err))?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| {
                if err.kind() == io::ErrorKind::AlreadyExists {
                    CalendarError::AlreadyExists {
                        path: path.to_path_buf(),
                    }
                } else {
                    CalendarError::io(path, err)
                }
            })?;
        file.write_all(ics::render(&ics::Document::default()).as_bytes())
            .map_err(|err| CalendarError::io(path, err))?;
        tracing::debug!(path = %path.display(), "created empty calendar");
        Ok(())
    }

    /// Opens an existing calendar and loads its events.
    pub fn open(path: &Path) -> Result<Self, CalendarError> {
        if !path.exists() {
            return Err(CalendarError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let lock_path = sibling(path, ".lock");
        let lock = File::create(&lock_path).map_err(|err| CalendarError::io(&lock_path, err))?;
        lock.try_lock_exclusive().map_err(|_| CalendarError::Locked {
            path: path.to_path_buf(),
        })?;

        let text = fs::read_to_string(path).map_err(|err| CalendarError::io(path, err))?;
        let doc = ics::parse(&text).map_err(|source| CalendarError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            events = doc.events().len(),
            "loaded calendar"
        );

        Ok(Self {
            path: path.to_path_buf(),
            doc,
            dirty: false,
            _lock: lock,
        })
    }

    /// Opens the calendar, runs `f`, and closes the store whether or not
    /// `f` succeeded.
    ///
    /// If both `f` and the final flush fail, the error from `f` is returned
    /// and the flush error is logged.
    pub fn scoped<T, E, F>(path: &Path, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<CalendarError>,
    {
        let mut store = Self::open(path)?;
        let result = f(&mut store);
        let closed = store.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                tracing::error!(error = %close_err, "failed to flush calendar after error");
                Err(err)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All events, in file order followed by events appended since open.
    pub fn events(&self) -> &[CalendarEvent] {
        self.doc.events()
    }

    /// Adds an event. Nothing is written until the next flush.
    pub fn append(&mut self, event: CalendarEvent) {
        tracing::debug!(uid = %event.uid, location = %event.location, "appending event");
        self.doc.push(event);
        self.dirty = true;
    }

    /// Returns an existing event occupying `slot` on `date`, in any room.
    pub fn booking_for_slot(&self, date: NaiveDate, slot: &TimeSlot) -> Option<&CalendarEvent> {
        self.doc
            .events()
            .iter()
            .find(|event| event.covers_slot(date, slot))
    }

    /// Whether there are appended events not yet written to disk.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rewrites the whole calendar file.
    ///
    /// The new contents go to a sibling temp file which then replaces the
    /// original, so a failed write leaves the previous calendar intact.
    pub fn flush(&mut self) -> Result<(), CalendarError> {
        let tmp_path = sibling(&self.path, ".tmp");
        let rendered = ics::render(&self.doc);
        {
            let mut tmp = File::create(&tmp_path).map_err(|err| CalendarError::io(&tmp_path, err))?;
            tmp.write_all(rendered.as_bytes())
                .and_then(|()| tmp.sync_all())
                .map_err(|err| CalendarError::io(&tmp_path, err))?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|err| CalendarError::io(&self.path, err))?;
        self.dirty = false;
        tracing::debug!(
            path = %self.path.display(),
            events = self.doc.events().len(),
            "flushed calendar"
        );
        Ok(())
    }

    /// Flushes pending events and releases the calendar.
    ///
    /// A failed flush is reported here only; the drop that follows does not
    /// retry it.
    pub fn close(mut self) -> Result<(), CalendarError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), CalendarError> {
        let result = if self.dirty { self.flush() } else { Ok(()) };
        self.dirty = false;
        result
    }
}

impl Drop for CalendarStore {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(err) = self.flush() {
                tracing::error!(error = %err, "failed to flush calendar on drop");
            }
        }
    }
}

/// `<path><suffix>` next to `path`, e.g. `library.ics.lock`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("calendar"), ToOwned::to_owned);
    name.push(suffix);
    path.with_file_name(name)
}
