//! Command execution and terminal output.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::warn;

use mmcdesk_core::api::{ApiClient, ApiError, AuthGateway, RecordingNavigator};
use mmcdesk_core::auth::flow::RESEND_UNAVAILABLE;
use mmcdesk_core::auth::{
    Authenticator, CredentialSlot, CredentialStore, FlowError, GateDecision, LoginForm, RegisterForm,
    RegisterOutcome, RegistrationFlow, ResendOutcome, RouteGate, SessionState, TokenStore,
    VerifyOutcome, LANDING_PATH, LOGIN_PATH,
};
use mmcdesk_core::models::{Customer, ListQuery, Page, Product, SortOrder, Transaction};
use mmcdesk_core::utils::{format_amount, format_datetime, format_optional, format_size, truncate_string};
use mmcdesk_core::Config;

use crate::cli::{Command, CustomerAction, ListArgs, ProductAction, Resource, TransactionAction};

/// Width of name columns in list output
const NAME_WIDTH: usize = 20;

pub struct Console {
    config: Config,
    tokens: TokenStore,
    navigator: Arc<RecordingNavigator>,
    client: ApiClient,
    auth: Authenticator,
    gate: RouteGate,
}

impl Console {
    pub fn open(config: Config, base_url: &str, cache_dir: &Path) -> Result<Self> {
        let tokens = TokenStore::open(cache_dir);
        let session = SessionState::init(&tokens);
        let navigator = Arc::new(RecordingNavigator::default());
        let gateway = AuthGateway::new(
            base_url,
            tokens.clone(),
            session,
            navigator.clone(),
        )
        .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            tokens,
            navigator,
            client: ApiClient::new(gateway.clone()),
            auth: Authenticator::new(gateway),
            gate: RouteGate::default(),
        })
    }

    pub async fn run(mut self, command: Command) -> Result<()> {
        if let Some(page) = command.page() {
            self.enter(page)?;
        }

        let result = match command {
            Command::Login { username, remember } => self.login(username, remember).await,
            Command::Logout => self.logout(),
            Command::WhoAmI => self.whoami(),
            Command::Register => self.register().await,
            Command::Verify { code } => self.verify(&code).await,
            Command::Resend => self.resend().await,
            Command::Customers { action } => match action {
                CustomerAction::List(args) => self.list(Resource::Customers, &args).await,
                CustomerAction::Get { id } => self.get(Resource::Customers, &id).await,
            },
            Command::Products { action } => match action {
                ProductAction::List(args) => self.list(Resource::Products, &args).await,
                ProductAction::Get { id } => self.get(Resource::Products, &id).await,
                ProductAction::Export(args) => self.export(&args).await,
            },
            Command::Transactions { action } => match action {
                TransactionAction::List(args) => self.list(Resource::Transactions, &args).await,
                TransactionAction::Get { id } => self.get(Resource::Transactions, &id).await,
                TransactionAction::Choices => self.choices().await,
            },
            Command::Gate { path } => self.show_gate(&path),
            Command::Health => self.health().await,
        };

        result.map_err(|e| match e.downcast_ref::<ApiError>() {
            Some(ApiError::SessionTerminated) => {
                anyhow!("Your session has ended. Run `mmcdesk login` to sign in again.")
            }
            _ => e,
        })
    }

    /// Pass the route gate for a console page and make it the current
    /// location.
    fn enter(&self, page: &str) -> Result<()> {
        match self.gate.evaluate(page, self.tokens.cookie_token().as_deref()) {
            GateDecision::Proceed => {
                self.navigator.set_location(page);
                Ok(())
            }
            GateDecision::Redirect(to) if to == LOGIN_PATH => {
                self.tokens.remember_location(page);
                bail!("Not signed in. Run `mmcdesk login` first.")
            }
            GateDecision::Redirect(to) => bail!("Redirected to {}", to),
        }
    }

    // ===== Session =====

    async fn login(&mut self, username: Option<String>, remember: bool) -> Result<()> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(name) if !name.is_empty() => name,
            _ => prompt("Username: ")?,
        };
        let remember = remember || self.config.remember_login;

        let stored = if remember {
            CredentialStore::get_password(CredentialSlot::Remembered, &username)
        } else {
            None
        };
        let used_stored = stored.is_some();
        let password = match stored {
            Some(password) => password,
            None => rpassword::prompt_password("Password: ")?,
        };

        let form = LoginForm {
            username: username.clone(),
            password,
            remember,
        };
        let destination = match self.auth.login(&form).await {
            Ok(destination) => destination,
            Err(FlowError::Rejected(message)) if used_stored => {
                warn!("Stored password was rejected, removing it");
                if let Err(e) = CredentialStore::delete(CredentialSlot::Remembered, &username) {
                    warn!(error = %e, "Failed to delete stored password");
                }
                bail!("{} The saved password was removed; run `mmcdesk login` again.", message)
            }
            Err(e) => return Err(e.into()),
        };

        if remember && !used_stored {
            if let Err(e) = CredentialStore::store(CredentialSlot::Remembered, &username, &form.password) {
                warn!(error = %e, "Failed to store credentials");
            }
        }

        self.config.last_username = Some(username.clone());
        self.config.remember_login = remember;
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!("Signed in as {}.", username);
        if destination != LANDING_PATH {
            println!("You were last at {}.", destination);
        }
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        self.auth.logout();
        println!("Signed out.");
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        match self.auth.gateway().session().current_user() {
            Some(user) => {
                println!("{}", user.name);
                println!("  email: {}", format_optional(Some(user.email.as_str()), "-"));
                println!("  role:  {}", format_optional(Some(user.role.as_str()), "-"));
                if !self.tokens.is_authenticated() {
                    println!("  (session cookie missing; sign in again to use the console)");
                }
            }
            None => println!("Not signed in."),
        }
        Ok(())
    }

    async fn register(&self) -> Result<()> {
        let form = RegisterForm {
            username: prompt("Username: ")?,
            email: prompt("Email: ")?,
            first_name: prompt("First name: ")?,
            last_name: prompt("Last name: ")?,
            password: rpassword::prompt_password("Password: ")?,
            confirm_password: rpassword::prompt_password("Confirm password: ")?,
        };

        let mut flow = RegistrationFlow::new(self.auth.clone());
        match flow.register(&form).await? {
            RegisterOutcome::VerificationRequired => {
                // Parked so `verify` can sign in without asking again
                if let Err(e) = CredentialStore::store(
                    CredentialSlot::PendingRegistration,
                    &form.username,
                    &form.password,
                ) {
                    warn!(error = %e, "Could not keep password for sign-in after verification");
                }
                println!("Registered. A verification code was sent to {}.", form.email);
                println!("Run `mmcdesk verify <code>` to finish.");
            }
            RegisterOutcome::SignedIn { .. } => println!("Registered and signed in as {}.", form.username),
            RegisterOutcome::Registered { .. } => {
                println!("Registered. Run `mmcdesk login -u {}` to sign in.", form.username)
            }
        }
        Ok(())
    }

    async fn verify(&self, code: &str) -> Result<()> {
        let mut flow = RegistrationFlow::restore(self.auth.clone());
        let username = flow
            .pending()
            .map(|p| p.username.clone())
            .ok_or(FlowError::NotAwaitingVerification)?;

        let password = match CredentialStore::get_password(CredentialSlot::PendingRegistration, &username) {
            Some(password) => password,
            None => rpassword::prompt_password("Password (to sign in after verification): ")?,
        };
        flow.set_password(password);
        flow.set_code(code);

        let outcome = flow.verify().await?;
        if let Err(e) = CredentialStore::settle_pending(&username, self.config.remember_login) {
            warn!(error = %e, "Failed to clear parked registration password");
        }

        match outcome {
            VerifyOutcome::SignedIn { .. } => println!("Email verified. Signed in as {}.", username),
            VerifyOutcome::VerifiedPleaseLogin { .. } => {
                println!("Email verified. Run `mmcdesk login -u {}` to sign in.", username)
            }
        }
        Ok(())
    }

    async fn resend(&self) -> Result<()> {
        let mut flow = RegistrationFlow::restore(self.auth.clone());
        match flow.resend().await? {
            ResendOutcome::Sent => {
                let email = flow.pending().map(|p| p.email.as_str()).unwrap_or("your email");
                println!("A new code was sent to {}.", email);
            }
            ResendOutcome::Unavailable => println!("{}", RESEND_UNAVAILABLE),
        }
        Ok(())
    }

    // ===== Resources =====

    async fn list(&self, resource: Resource, args: &ListArgs) -> Result<()> {
        let query = list_query(args);
        match resource {
            Resource::Customers => {
                let page = self.client.list_customers(&query).await?;
                print_page(&page, customer_row);
            }
            Resource::Products => {
                let page = self.client.list_products(&query).await?;
                print_page(&page, product_row);
            }
            Resource::Transactions => {
                let page = self.client.list_transactions(&query).await?;
                print_page(&page, transaction_row);
            }
        }
        Ok(())
    }

    async fn get(&self, resource: Resource, id: &str) -> Result<()> {
        let value = match resource {
            Resource::Customers => serde_json::to_value(self.client.get_customer(id).await?)?,
            Resource::Products => serde_json::to_value(self.client.get_product(id).await?)?,
            Resource::Transactions => serde_json::to_value(self.client.get_transaction(id).await?)?,
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }

    async fn export(&self, args: &ListArgs) -> Result<()> {
        let link = self.client.export_products(&list_query(args)).await?;
        println!("{}", link.download_url);
        println!(
            "  {} ({}), link expires {}",
            link.file_name_or_default(),
            format_size(link.size),
            format_optional(Some(format_datetime(&link.expire_at).as_str()), "-")
        );
        Ok(())
    }

    async fn choices(&self) -> Result<()> {
        let choices = self.client.transaction_choices().await?;
        println!("Customers:");
        for c in &choices.customers {
            println!("  {:<14} {}", c.customer_id, c.full_name());
        }
        println!("Products:");
        for p in &choices.products {
            println!("  {:<14} {} [{}]", p.product_id, p.product_name, p.product_type);
        }
        Ok(())
    }

    // ===== Diagnostics =====

    fn show_gate(&self, path: &str) -> Result<()> {
        match self.gate.evaluate(path, self.tokens.cookie_token().as_deref()) {
            GateDecision::Proceed => println!("proceed"),
            GateDecision::Redirect(to) => println!("redirect -> {}", to),
        }
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        let status = self.client.health().await?;
        println!("{} is up", self.auth.gateway().base_url());
        if !status.is_null() {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn list_query(args: &ListArgs) -> ListQuery {
    let mut query = ListQuery::new();
    if let Some(page) = args.page {
        query = query.page(page);
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    if let Some(search) = &args.search {
        query = query.search(search.clone());
    }
    if let Some(sort_by) = &args.sort_by {
        let order = if args.ascending { SortOrder::Asc } else { SortOrder::Desc };
        query = query.sort(sort_by.clone(), order);
    } else if args.ascending {
        query.sort_order = SortOrder::Asc;
    }
    for (key, value) in &args.filters {
        query = query.filter(key.clone(), value.clone());
    }
    query
}

fn print_page<T>(page: &Page<T>, row: fn(&T) -> String) {
    if page.is_empty() {
        println!("No results.");
        return;
    }
    for item in &page.data {
        println!("{}", row(item));
    }
    println!(
        "-- page {} of {} ({} total)",
        page.page,
        page.total_pages.max(1),
        page.total
    );
}

fn customer_row(c: &Customer) -> String {
    format!(
        "{:<14} {:<w$} {:<28} {:<2} {}",
        c.customer_id,
        truncate_string(&c.full_name(), NAME_WIDTH),
        truncate_string(&c.email, 28),
        c.risk_level,
        c.status.as_str(),
        w = NAME_WIDTH,
    )
}

fn product_row(p: &Product) -> String {
    format!(
        "{:<14} {:<w$} {:<4} {:<2} {:>6.2}% {:>16} {}",
        p.product_id,
        truncate_string(&p.product_name, NAME_WIDTH),
        p.product_type,
        p.risk_level,
        p.expected_return,
        format_amount(p.min_investment),
        format_optional(Some(p.status.as_str()), "-"),
        w = NAME_WIDTH,
    )
}

fn transaction_row(t: &Transaction) -> String {
    format!(
        "{:<14} {:<w$} {:<4} {:>16} {:<6} {:<8} {}",
        t.transaction_id,
        truncate_string(
            t.customer_name.as_deref().unwrap_or(&t.customer_id),
            NAME_WIDTH
        ),
        t.transaction_type.label(),
        format_amount(t.total_amount),
        t.transaction_status.map(|s| s.label()).unwrap_or("-"),
        t.payment_method.label(),
        format_datetime(&t.created_at),
        w = NAME_WIDTH,
    )
}
