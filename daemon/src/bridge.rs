/// Best-effort OS notification feed of target launch/termination.
///
/// On macOS an `NSWorkspace` notification-center observer runs on a
/// dedicated thread with its own run loop and forwards level observations
/// ("target present" / "target absent") to the main event loop. Delivery is
/// best-effort by nature: a notification can be missed (for example when the
/// target launched before this daemon), so the poll loop remains the source
/// of truth and the bridge only lowers detection latency.
///
/// On non-macOS platforms the public API compiles but is a no-op at runtime
/// and the daemon runs poll-only.
#[cfg(target_os = "macos")]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::event::DaemonEvent;

/// Executable base name the observer compares against. Set once by [`start`].
static TARGET_NAME: OnceLock<String> = OnceLock::new();

/// Channel used to forward observations from the notification callbacks to
/// the main event loop. Set once by [`start`].
static BRIDGE_TX: OnceLock<mpsc::Sender<DaemonEvent>> = OnceLock::new();

/// Signals the observer thread to unsubscribe and exit.
#[cfg(target_os = "macos")]
static STOP: AtomicBool = AtomicBool::new(false);

// ── Public handle ─────────────────────────────────────────────────────────────

/// A handle to the running workspace observer thread.
pub struct BridgeHandle {
    #[cfg(target_os = "macos")]
    thread: std::thread::JoinHandle<()>,
}

impl BridgeHandle {
    /// Unsubscribes from workspace notifications and blocks until the
    /// observer thread exits.
    pub fn stop(self) {
        #[cfg(target_os = "macos")]
        {
            STOP.store(true, Ordering::Relaxed);
            let _ = self.thread.join();
        }
    }
}

// ── Startup ───────────────────────────────────────────────────────────────────

/// Subscribes to application launch/termination notifications and returns a
/// [`BridgeHandle`] for managing the observer.
///
/// A failed subscription is not fatal to the daemon: the caller logs it and
/// keeps running on the poll loop alone.
pub fn start(target: &str, tx: mpsc::Sender<DaemonEvent>) -> Result<BridgeHandle> {
    // Silently ignore if called more than once (e.g. in test binaries).
    let _ = TARGET_NAME.set(target.to_string());
    let _ = BRIDGE_TX.set(tx);

    #[cfg(target_os = "macos")]
    {
        use anyhow::Context;

        let thread = std::thread::Builder::new()
            .name("workspace-bridge".into())
            .spawn(imp::run_observer)
            .context("Failed to spawn workspace observer thread")?;
        eprintln!("[bridge] Subscribed to workspace launch/termination notifications");
        Ok(BridgeHandle { thread })
    }

    #[cfg(not(target_os = "macos"))]
    {
        eprintln!("[bridge] No workspace notification source on this platform; running poll-only");
        Ok(BridgeHandle {})
    }
}

// ── macOS implementation ──────────────────────────────────────────────────────

#[cfg(target_os = "macos")]
mod imp {
    use std::ffi::{CStr, CString};
    use std::os::raw::c_char;
    use std::sync::atomic::Ordering;

    use objc::declare::ClassDecl;
    use objc::rc::autoreleasepool;
    use objc::runtime::{Class, Object, Sel, BOOL};
    use objc::{class, msg_send, sel, sel_impl};

    use super::{BRIDGE_TX, STOP, TARGET_NAME};
    use crate::event::DaemonEvent;

    /// Builds (once) and returns the Objective-C observer class whose two
    /// selectors receive the workspace notifications.
    fn observer_class() -> &'static Class {
        static REGISTER: std::sync::Once = std::sync::Once::new();
        REGISTER.call_once(|| {
            let mut decl = ClassDecl::new("CrossStrikeWorkspaceObserver", class!(NSObject))
                .expect("observer class registered twice");
            unsafe {
                decl.add_method(
                    sel!(appLaunched:),
                    app_launched as extern "C" fn(&Object, Sel, *mut Object),
                );
                decl.add_method(
                    sel!(appTerminated:),
                    app_terminated as extern "C" fn(&Object, Sel, *mut Object),
                );
            }
            decl.register();
        });
        Class::get("CrossStrikeWorkspaceObserver").expect("observer class is registered")
    }

    extern "C" fn app_launched(_this: &Object, _sel: Sel, notification: *mut Object) {
        unsafe { forward(notification, true) }
    }

    extern "C" fn app_terminated(_this: &Object, _sel: Sel, notification: *mut Object) {
        unsafe { forward(notification, false) }
    }

    /// Extracts the executable base name from the notification and, when it
    /// matches the watched target, forwards a level observation.
    unsafe fn forward(notification: *mut Object, present: bool) {
        let Some(name) = executable_name(notification) else {
            return;
        };
        let Some(target) = TARGET_NAME.get() else {
            return;
        };
        if &name != target {
            return;
        }
        if let Some(tx) = BRIDGE_TX.get() {
            // try_send keeps notification delivery non-blocking; a dropped
            // event is healed by the next poll tick.
            let _ = tx.try_send(DaemonEvent::Observation { present });
        }
    }

    /// `notification.userInfo[NSWorkspaceApplicationKey].executableURL
    /// .lastPathComponent`, with every hop null-checked: workspace
    /// notifications are not guaranteed to carry complete app info.
    unsafe fn executable_name(notification: *mut Object) -> Option<String> {
        let user_info: *mut Object = msg_send![notification, userInfo];
        if user_info.is_null() {
            return None;
        }
        let key = nsstring("NSWorkspaceApplicationKey");
        let app: *mut Object = msg_send![user_info, objectForKey: key];
        if app.is_null() {
            return None;
        }
        let url: *mut Object = msg_send![app, executableURL];
        if url.is_null() {
            return None;
        }
        let name: *mut Object = msg_send![url, lastPathComponent];
        if name.is_null() {
            return None;
        }
        let utf8: *const c_char = msg_send![name, UTF8String];
        if utf8.is_null() {
            return None;
        }
        Some(CStr::from_ptr(utf8).to_string_lossy().into_owned())
    }

    unsafe fn nsstring(s: &str) -> *mut Object {
        let c = CString::new(s).expect("static string contains no NUL");
        msg_send![class!(NSString), stringWithUTF8String: c.as_ptr()]
    }

    /// Registers the observer with the shared workspace notification center
    /// and pumps the thread's run loop in short slices until [`STOP`] is set,
    /// then unsubscribes.
    pub fn run_observer() {
        autoreleasepool(|| unsafe {
            let observer: *mut Object = msg_send![observer_class(), new];
            let workspace: *mut Object = msg_send![class!(NSWorkspace), sharedWorkspace];
            let center: *mut Object = msg_send![workspace, notificationCenter];

            let launch_name = nsstring("NSWorkspaceDidLaunchApplicationNotification");
            let terminate_name = nsstring("NSWorkspaceDidTerminateApplicationNotification");
            let nil: *mut Object = std::ptr::null_mut();
            let _: () = msg_send![center, addObserver: observer
                                           selector: sel!(appLaunched:)
                                               name: launch_name
                                             object: nil];
            let _: () = msg_send![center, addObserver: observer
                                           selector: sel!(appTerminated:)
                                               name: terminate_name
                                             object: nil];

            // Short run-loop slices so the stop flag is honored promptly.
            let mode = nsstring("kCFRunLoopDefaultMode");
            while !STOP.load(Ordering::Relaxed) {
                autoreleasepool(|| {
                    let run_loop: *mut Object = msg_send![class!(NSRunLoop), currentRunLoop];
                    let deadline: *mut Object =
                        msg_send![class!(NSDate), dateWithTimeIntervalSinceNow: 0.25f64];
                    let _: BOOL = msg_send![run_loop, runMode: mode beforeDate: deadline];
                });
            }

            let _: () = msg_send![center, removeObserver: observer];
            let _: () = msg_send![observer, release];
            eprintln!("[bridge] Workspace observer thread exited");
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
