//! Subcommand handlers.

use std::process::ExitCode;

use tracing::{info, warn};

use backoffice_core::{evaluate, GuardDecision, GuestGuard, PermissionsExt, RequiredPermission, Routes};
use backoffice_proto::Credentials;

use crate::app::App;
use crate::formatter::Formatter;
use crate::routes;

/// Sign in unless a session is already held.
pub async fn login(app: &App, formatter: &dyn Formatter, email: String, password: String) -> anyhow::Result<ExitCode> {
    app.session.hydrate().await?;

    if let GuardDecision::Redirect(to) = GuestGuard::new(Routes::default()).decide(&app.session.hydration()) {
        let name = app
            .session
            .principal()
            .map(|p| p.display_name().to_string())
            .unwrap_or_default();
        println!(
            "{}",
            formatter.format_message(&format!("already signed in as {}; redirect to {}", name, to))
        );
        return Ok(ExitCode::SUCCESS);
    }

    let principal = app
        .backend
        .auth()
        .sign_in(&Credentials::new(email, password))
        .await?;
    let permissions = principal.effective_permissions();
    let output = formatter.format_principal(&principal, &permissions);

    app.session.set_principal(Some(principal)).await?;
    app.save_cookies().await?;
    println!("{}", output);
    Ok(ExitCode::SUCCESS)
}

/// Sign out on the server, then forget the local session.
pub async fn logout(app: &App, formatter: &dyn Formatter) -> anyhow::Result<ExitCode> {
    app.session.hydrate().await?;

    if app.session.principal().is_some() {
        // The local session is cleared even if the server call fails.
        if let Err(e) = app.backend.auth().sign_out().await {
            warn!(error = %e, "server sign-out failed");
        }
    }

    app.session.clear_principal().await?;
    app.settings.clear().await?;
    app.forget_cookies().await?;
    info!("local session removed");
    println!("{}", formatter.format_message("signed out"));
    Ok(ExitCode::SUCCESS)
}

/// Revalidate the session and print the principal.
pub async fn whoami(app: &App, formatter: &dyn Formatter) -> anyhow::Result<ExitCode> {
    initialize(app).await?;

    match app.session.principal() {
        Some(principal) => {
            println!(
                "{}",
                formatter.format_principal(&principal, &principal.effective_permissions())
            );
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("{}", formatter.format_message("not signed in"));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Evaluate a requirement against the stored session. Exits non-zero when
/// denied.
pub async fn can(app: &App, formatter: &dyn Formatter, required: &str) -> anyhow::Result<ExitCode> {
    let required: RequiredPermission = required.parse()?;
    app.session.hydrate().await?;

    let principal = app.session.principal();
    let allowed = evaluate(principal.as_deref(), &required);
    println!("{}", formatter.format_check(&required, allowed));

    Ok(if allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Decide what visiting `route` would do.
pub async fn visit(app: &App, formatter: &dyn Formatter, route: &str) -> anyhow::Result<ExitCode> {
    initialize(app).await?;

    let decision = routes::visit(route, &Routes::default(), &app.session.hydration());
    println!("{}", formatter.format_decision(route, &decision));
    Ok(ExitCode::SUCCESS)
}

/// List routes with the decision for the current session.
pub async fn list_routes(app: &App, formatter: &dyn Formatter) -> anyhow::Result<ExitCode> {
    initialize(app).await?;

    let session = app.session.hydration();
    let defaults = Routes::default();
    let rows: Vec<_> = routes::ROUTES
        .iter()
        .map(|entry| (*entry, entry.decide(&defaults, &session)))
        .collect();
    println!("{}", formatter.format_routes(&rows));
    Ok(ExitCode::SUCCESS)
}

/// Run startup and persist any refreshed cookies.
async fn initialize(app: &App) -> anyhow::Result<()> {
    let mount = app.initializer.mount();
    let outcome = app.initializer.run(&mount).await;
    info!(?outcome, "initialized");
    app.save_cookies().await
}
