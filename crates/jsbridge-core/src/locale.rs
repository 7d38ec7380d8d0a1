//! Numeric locale pinning
//!
//! The engine parses and prints numbers through the C library, which honours
//! the thread's `LC_NUMERIC` category. Under a locale with a comma decimal
//! separator, `2.37` parses as `2`. Every engine entry therefore runs with the
//! "C" numeric locale installed on the calling thread and restores the previous
//! locale afterwards.
//!
//! Enabled by the `locale-workaround` feature on unix targets; a no-op elsewhere.

/// Thread-local numeric locale override
pub(crate) struct NumericLocale {
    #[cfg(all(feature = "locale-workaround", unix))]
    locale: libc::locale_t,
}

#[cfg(all(feature = "locale-workaround", unix))]
impl NumericLocale {
    pub(crate) fn new() -> Self {
        // SAFETY: "C" is a valid NUL-terminated locale name and a null base is allowed.
        let locale =
            unsafe { libc::newlocale(libc::LC_NUMERIC_MASK, c"C".as_ptr(), std::ptr::null_mut()) };
        if locale.is_null() {
            log::warn!("failed to create the C numeric locale; number parsing follows the process locale");
        }
        Self { locale }
    }

    /// Install the locale until the returned guard is dropped
    pub(crate) fn enter(&self) -> LocaleGuard {
        if self.locale.is_null() {
            return LocaleGuard {
                previous: std::ptr::null_mut(),
            };
        }
        // SAFETY: `self.locale` is a live locale object owned by `self`, which
        // outlives the guard because guards never escape an engine entry.
        let previous = unsafe { libc::uselocale(self.locale) };
        LocaleGuard { previous }
    }
}

#[cfg(all(feature = "locale-workaround", unix))]
impl Drop for NumericLocale {
    fn drop(&mut self) {
        if !self.locale.is_null() {
            // SAFETY: created by `newlocale` and not installed on any thread anymore.
            unsafe { libc::freelocale(self.locale) };
        }
    }
}

/// Restores the previous thread locale on drop
pub(crate) struct LocaleGuard {
    #[cfg(all(feature = "locale-workaround", unix))]
    previous: libc::locale_t,
}

#[cfg(all(feature = "locale-workaround", unix))]
impl Drop for LocaleGuard {
    fn drop(&mut self) {
        if !self.previous.is_null() {
            // SAFETY: `previous` was returned by `uselocale` and is still valid.
            unsafe { libc::uselocale(self.previous) };
        }
    }
}

#[cfg(not(all(feature = "locale-workaround", unix)))]
impl NumericLocale {
    pub(crate) fn new() -> Self {
        Self {}
    }

    #[inline(always)]
    pub(crate) fn enter(&self) -> LocaleGuard {
        LocaleGuard {}
    }
}
