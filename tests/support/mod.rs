#![allow(dead_code)]

pub mod fake_subsonic;
pub mod socket_guard;
