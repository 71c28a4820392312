//! Sync-level and model-level flag sets.
//!
//! Both are small bitsets combinable with `|`:
//!
//! ```rust
//! use treesync_core::SyncFlags;
//!
//! let flags = SyncFlags::CONTINUE_ON_FAILURE | SyncFlags::SKIP_UNMATCHED_DST;
//! assert!(flags.contains(SyncFlags::SKIP_UNMATCHED_DST));
//! assert!(!flags.contains(SyncFlags::SKIP_UNMATCHED_BOTH));
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$fmeta:meta])* $flag:ident = $bits:expr; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u8);

        impl $name {
            /// No flags set.
            pub const NONE: Self = Self(0);
            $( $(#[$fmeta])* pub const $flag: Self = Self($bits); )+

            const NAMED: &'static [(&'static str, $name)] = &[$((stringify!($flag), Self::$flag)),+];

            /// Creates a flag set from raw bits, dropping unknown bits.
            #[must_use]
            pub const fn from_bits(bits: u8) -> Self {
                Self(bits & (0 $(| $bits)+))
            }

            /// Returns the raw bits.
            #[must_use]
            pub const fn bits(self) -> u8 {
                self.0
            }

            /// Returns `true` if every flag in `other` is set.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Returns `true` if any flag in `other` is set.
            #[must_use]
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Returns `true` if no flag is set.
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Sets every flag in `other`.
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Clears every flag in `other`.
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_empty() {
                    return write!(f, "{}(NONE)", stringify!($name));
                }
                let mut rest = *self;
                let mut names = Vec::new();
                for (label, flag) in Self::NAMED {
                    // Composite flags are already covered by their members.
                    if self.contains(*flag) && rest.intersects(*flag) {
                        names.push(*label);
                        rest.remove(*flag);
                    }
                }
                write!(f, "{}({})", stringify!($name), names.join(" | "))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

flag_set! {
    /// Flags controlling a whole diff or sync call.
    SyncFlags {
        /// Keep syncing after a per-record CRUD error instead of aborting.
        CONTINUE_ON_FAILURE = 0b0001;
        /// Skip records that exist only in the source (never create them).
        SKIP_UNMATCHED_SRC = 0b0010;
        /// Skip records that exist only in the destination (never delete them).
        SKIP_UNMATCHED_DST = 0b0100;
        /// Both `SKIP_UNMATCHED_SRC` and `SKIP_UNMATCHED_DST`.
        SKIP_UNMATCHED_BOTH = 0b0110;
        /// Log elements whose action is `none` as well.
        LOG_UNCHANGED_RECORDS = 0b1000;
    }
}

flag_set! {
    /// Flags carried by an individual record or defaulted per record type.
    ModelFlags {
        /// Exclude the record from diff and sync, as if absent on that side.
        IGNORE = 0b00001;
        /// Discard children from the store on delete without invoking their hooks.
        SKIP_CHILDREN_ON_DELETE = 0b00010;
        /// Skip this record when it exists only in the source.
        SKIP_UNMATCHED_SRC = 0b00100;
        /// Skip this record when it exists only in the destination.
        SKIP_UNMATCHED_DST = 0b01000;
        /// Run children's delete hooks before this record's own delete hook.
        NATURAL_DELETION_ORDER = 0b10000;
    }
}
