/// Read-only view of the live session a state file is being loaded into.
///
/// Steps receive it as `Option<&dyn SessionLookup>`: a migration never keeps
/// it beyond the call and must degrade gracefully when it is absent.
pub trait SessionLookup {
    /// Integer value of `property` on the proxy registered as `name` in `group`
    /// (e.g. `settings` / `GeneralSettings` / `TransferFunctionResetMode`).
    fn setting_int(&self, group: &str, name: &str, property: &str) -> Option<i64>;

    /// Allocate the next globally unique proxy identifier.
    fn next_global_id(&self) -> u32;
}
