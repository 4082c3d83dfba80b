//! D-Bus proxy for `com.endlessm.Payg1`.

use zbus::dbus_proxy;

pub const EOS_PAYG_NAME: &str = "com.endlessm.Payg1";
pub const EOS_PAYG_PATH: &str = "/com/endlessm/Payg1";
pub const EOS_PAYG_INTERFACE: &str = "com.endlessm.Payg1";

#[dbus_proxy(
    interface = "com.endlessm.Payg1",
    default_service = "com.endlessm.Payg1",
    default_path = "/com/endlessm/Payg1"
)]
pub trait Payg1 {
    fn add_code(&self, code: &str) -> zbus::Result<()>;

    fn clear_code(&self) -> zbus::Result<()>;

    /// Emitted once when the subscription runs out.
    #[dbus_proxy(signal)]
    fn expired(&self) -> zbus::Result<()>;

    #[dbus_proxy(property)]
    fn expiry_time(&self) -> zbus::Result<u64>;

    #[dbus_proxy(property)]
    fn enabled(&self) -> zbus::Result<bool>;

    #[dbus_proxy(property)]
    fn rate_limit_end_time(&self) -> zbus::Result<u64>;
}
