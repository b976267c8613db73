//! Tests for the Activation Controller

mod common;

use comp_core::activation::ThemeSelection;
use comp_core::cache::{PackageMap, PackageRecord};
use comp_core::{ActivationController, AppContext, Event, Settings};
use comp_test_utils::site::TestSite;
use common::FakeHost;
use pretty_assertions::assert_eq;

fn plugins(keys: &[&str]) -> PackageMap {
    keys.iter()
        .map(|k| (k.to_string(), PackageRecord::new(*k, format!("wpackagist-plugin/{k}"), "1.0")))
        .collect()
}

fn setup() -> (TestSite, AppContext) {
    let site = TestSite::new();
    for slug in ["x", "y", "z"] {
        site.plugin_files(slug, slug, "1.0");
    }
    let ctx = AppContext::new(site.root(), Settings::default());
    (site, ctx)
}

#[test]
fn test_fatal_plugin_does_not_stop_the_others() {
    let (site, ctx) = setup();
    let host = FakeHost::new(site.path("wp-content/plugins")).with_fatal("x/x.php");
    let controller = ActivationController::new(&ctx, &host);

    let report = controller
        .activate_plugins(&plugins(&["x/x.php", "y/y.php", "z/z.php"]))
        .unwrap();

    assert!(!report.success());
    assert_eq!(
        *host.attempts.borrow(),
        vec!["x/x.php".to_string(), "y/y.php".to_string(), "z/z.php".to_string()]
    );
    assert!(!host.is_active("x/x.php"));
    assert!(host.is_active("y/y.php"));
    assert!(host.is_active("z/z.php"));
    assert_eq!(*host.deactivated.borrow(), vec!["x/x.php".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "x/x.php");
}

#[test]
fn test_already_active_is_not_reactivated() {
    let (site, ctx) = setup();
    let host = FakeHost::new(site.path("wp-content/plugins")).with_active("y/y.php");
    let controller = ActivationController::new(&ctx, &host);

    let report = controller.activate_plugins(&plugins(&["y/y.php", "z/z.php"])).unwrap();

    assert!(report.success());
    assert_eq!(report.already_active, vec!["y/y.php".to_string()]);
    assert_eq!(report.activated, vec!["z/z.php".to_string()]);
    assert_eq!(*host.attempts.borrow(), vec!["z/z.php".to_string()]);
}

#[test]
fn test_invalid_active_plugins_are_reported_not_failed() {
    let (site, ctx) = setup();
    let host = FakeHost::new(site.path("wp-content/plugins")).with_active("gone/gone.php");
    let controller = ActivationController::new(&ctx, &host);

    let report = controller.activate_plugins(&plugins(&["y/y.php"])).unwrap();

    assert!(report.success());
    assert_eq!(report.invalid.len(), 1);
    assert_eq!(report.invalid[0].plugin, "gone/gone.php");
}

#[test]
fn test_activation_publishes_events() {
    let (site, ctx) = setup();
    let host = FakeHost::new(site.path("wp-content/plugins")).with_fatal("x/x.php");
    let controller = ActivationController::new(&ctx, &host);

    controller.activate_plugins(&plugins(&["x/x.php", "y/y.php"])).unwrap();

    assert_eq!(
        ctx.events().pending(),
        vec![
            Event::PluginDeactivated {
                plugin: "x/x.php".to_string()
            },
            Event::PluginActivated {
                plugin: "y/y.php".to_string()
            },
        ]
    );
}

#[test]
fn test_theme_activation() {
    let (site, ctx) = setup();
    let host = FakeHost::new(site.path("wp-content/plugins"));
    let controller = ActivationController::new(&ctx, &host);

    let mut themes = PackageMap::new();
    assert_eq!(controller.activate_theme(&themes).unwrap(), ThemeSelection::NoTheme);

    themes.insert("astra".to_string(), PackageRecord::new("Astra", "wpackagist-theme/astra", "4.6.0"));
    let mut child = PackageRecord::new("Astra Child", "acme/astra-child", "1.0.0");
    child.template = Some("astra".to_string());
    themes.insert("astra-child".to_string(), child);

    assert_eq!(
        controller.activate_theme(&themes).unwrap(),
        ThemeSelection::Activated("astra-child".to_string())
    );
    assert_eq!(
        controller.activate_theme(&themes).unwrap(),
        ThemeSelection::AlreadyActive("astra-child".to_string())
    );
}
