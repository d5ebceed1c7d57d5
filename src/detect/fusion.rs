/// The tone counts as present when either window reports it.
pub fn fuse(fire_short: bool, fire_long: bool) -> bool {
    fire_short || fire_long
}
