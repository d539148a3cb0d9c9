mod time;

pub use time::{
    ceil_15min, floor_15min, localize_to_naive_utc, now_local, utc_cutoff_now, DATE_FORMAT,
    TIMESTAMP_FORMAT,
};
