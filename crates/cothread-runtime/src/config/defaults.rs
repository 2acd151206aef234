//! Compile-time defaults, merged by build.rs from library values and the
//! optional file named in `COTHREAD_CONFIG_RS`.

include!(concat!(env!("OUT_DIR"), "/cothread_merged_config.rs"));
