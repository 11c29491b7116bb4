//! # Command Dispatch
//!
//! The thin adapter between a chat transport and the account manager. A transport hands
//! over `(actor, text)`; the dispatcher parses the command, applies the authorization
//! gate, calls the ledger, audits the outcome and returns a [`Response`].
//!
//! ## Commands
//!
//! | command | scope |
//! |---------|-------|
//! | `/start`, `/help` | anyone |
//! | `/add <id>`, `/delete <id>`, `/renew <id>`, `/list` | managers and the super-admin |
//! | `/grant <actor>`, `/revoke <actor>`, `/backup`, `/repair` | the super-admin |
//!
//! ## Important Notes
//!
//! * Refused commands are answered, never dropped
//! * Ledger refusals are audited with the `_fail` action names

use crate::audit::{AuditAction, AuditLog};
use crate::responses::{account_listing, Response};
use warden_user::prelude::*;

/// A parsed command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Add(AccountId),
    Delete(AccountId),
    Renew(AccountId),
    List,
    Grant(ActorId),
    Revoke(ActorId),
    Backup,
    Repair,
}

/// Why a line could not be turned into a [`Command`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    NotACommand,
    Unknown(String),
    /// Wrong argument count or shape. Holds the usage line
    Usage(&'static str),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::NotACommand | ParseError::Unknown(_) => {
                write!(f, "Unknown command. Use /help to see the available commands.")
            }
            ParseError::Usage(usage) => write!(f, "Usage: {usage}"),
        }
    }
}

impl Command {
    /// Parses `/name [arg]`. A `@botname` suffix on the command is ignored
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or(ParseError::NotACommand)?;
        let name = head.strip_prefix('/').ok_or(ParseError::NotACommand)?;
        let name = name.split('@').next().unwrap_or(name).to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        let single = |usage: &'static str| -> Result<String, ParseError> {
            match args.as_slice() {
                [arg] => Ok(arg.to_string()),
                _ => Err(ParseError::Usage(usage)),
            }
        };

        let none = |usage: &'static str| -> Result<(), ParseError> {
            if args.is_empty() {
                Ok(())
            } else {
                Err(ParseError::Usage(usage))
            }
        };

        let account = |usage: &'static str| -> Result<AccountId, ParseError> {
            AccountId::parse(single(usage)?).map_err(|_| ParseError::Usage(usage))
        };

        let actor = |usage: &'static str| -> Result<ActorId, ParseError> {
            parse_actor_id(single(usage)?).map_err(|_| ParseError::Usage(usage))
        };

        match name.as_str() {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "add" => account("/add <username_or_id>").map(Command::Add),
            "delete" => account("/delete <username_or_id>").map(Command::Delete),
            "renew" => account("/renew <username_or_id>").map(Command::Renew),
            "list" => none("/list").map(|_| Command::List),
            "grant" => actor("/grant <numeric_id>").map(Command::Grant),
            "revoke" => actor("/revoke <numeric_id>").map(Command::Revoke),
            "backup" => none("/backup").map(|_| Command::Backup),
            "repair" => none("/repair").map(|_| Command::Repair),
            _ => Err(ParseError::Unknown(name.clone())),
        }
    }

    /// The privilege required before the ledger is consulted
    pub fn scope(&self) -> CommandScope {
        match self {
            Command::Start | Command::Help => CommandScope::Open,
            Command::Add(_)
            | Command::Delete(_)
            | Command::Renew(_)
            | Command::List => CommandScope::Management,
            Command::Grant(_) | Command::Revoke(_) | Command::Backup | Command::Repair => {
                CommandScope::SuperAdmin
            }
        }
    }
}

/// The help menu shown to `role`
pub fn help_text(role: Option<Role>, validity_days: i64) -> String {
    let mut text = format!(
        "VPN account management\n\n\
         /add <username_or_id> - Activate an account for {validity_days} days\n\
         /delete <username_or_id> - Remove an account you created\n\
         /renew <username_or_id> - Extend an account you created by {validity_days} days from today\n\
         /list - List the accounts you created\n\
         /help - Show this menu"
    );

    if role == Some(Role::SuperAdmin) {
        text.push_str(
            "\n\nSuper-admin\n\
             /list - Lists every account\n\
             /grant <numeric_id> - Allow an identity to manage accounts\n\
             /revoke <numeric_id> - Withdraw that permission\n\
             /backup - Back up every document\n\
             /repair - Remove orphaned tracking records\n\n\
             The super-admin may delete or renew accounts created by anyone.",
        );
    } else if role.is_none() {
        text.push_str("\n\nYou are not allowed to manage accounts. Ask the admin for access.");
    }

    text
}

/// Routes commands to the account manager
#[derive(Clone)]
pub struct Dispatcher {
    manager: AccountManager,
    audit: AuditLog,
}

impl Dispatcher {
    pub fn new(manager: AccountManager, audit: AuditLog) -> Self {
        Self { manager, audit }
    }

    pub fn account_manager(&self) -> &AccountManager {
        &self.manager
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    fn validity_days(&self) -> i64 {
        self.manager.settings().validity_days
    }

    /// Handles one line of input from `actor`
    pub async fn dispatch(&self, actor: ActorId, line: &str) -> Response {
        match Command::parse(line) {
            Ok(command) => self.execute(actor, command).await,
            Err(err) => Response::fail(err.to_string()),
        }
    }

    /// Runs an already parsed command on behalf of `actor`
    pub async fn execute(&self, actor: ActorId, command: Command) -> Response {
        let role = match self.manager.authorize(actor, command.scope()).await {
            Ok(role) => role,
            Err(err) => {
                log::warn!(target: "warden", "Refused {:?} from {}", command, actor);
                return Response::fail(err.into_string());
            }
        };

        match command {
            Command::Start => {
                let greeting = match role {
                    Some(Role::SuperAdmin) => "Hello, admin!".to_string(),
                    _ => format!("Hello, {actor}!"),
                };
                log::info!(target: "warden", "Identity {} started a session", actor);
                Response {
                    ok: true,
                    messages: vec![greeting, help_text(role, self.validity_days())],
                    attachment: None,
                }
            }

            Command::Help => Response::ok(help_text(role, self.validity_days())),

            Command::Add(id) => {
                let result = self.manager.add(id.clone(), actor).await;
                self.ledger_reply(actor, AuditAction::AddUsername, id, result)
                    .await
            }

            Command::Delete(id) => {
                let result = self.manager.delete(id.clone(), actor).await;
                self.ledger_reply(actor, AuditAction::DeleteUsername, id, result)
                    .await
            }

            Command::Renew(id) => {
                let result = self.manager.renew(id.clone(), actor).await;
                self.ledger_reply(actor, AuditAction::RenewUsername, id, result)
                    .await
            }

            Command::List => {
                let records = self.manager.list(actor).await;
                account_listing(actor, role, &records)
            }

            Command::Grant(target) => {
                let result = self
                    .manager
                    .grant(target)
                    .await
                    .map(|_| format!("Identity {target} can now manage accounts."));
                self.simple_reply(actor, AuditAction::GrantManager, target, result)
                    .await
            }

            Command::Revoke(target) => {
                let result = self
                    .manager
                    .revoke(target)
                    .await
                    .map(|_| format!("Identity {target} can no longer manage accounts."));
                self.simple_reply(actor, AuditAction::RevokeManager, target, result)
                    .await
            }

            Command::Backup => self.backup(actor).await,

            Command::Repair => match self.manager.repair(actor).await {
                Ok(report) => {
                    let message = report.to_string();
                    self.audit
                        .record(actor, AuditAction::Repair, true, None, message.clone())
                        .await;
                    Response::ok(message)
                }
                Err(err) => {
                    let message = err.into_string();
                    self.audit
                        .record(actor, AuditAction::Repair, false, None, message.clone())
                        .await;
                    Response::fail(message)
                }
            },
        }
    }

    async fn ledger_reply(
        &self,
        actor: ActorId,
        action: AuditAction,
        id: AccountId,
        result: Result<LedgerReceipt, AccountError>,
    ) -> Response {
        let target = Some(id.to_string());
        match result {
            Ok(receipt) => {
                let message = receipt.to_string();
                self.audit
                    .record(actor, action, true, target, message.clone())
                    .await;
                Response::ok(message)
            }
            Err(err) => {
                let message = err.into_string();
                self.audit
                    .record(actor, action, false, target, message.clone())
                    .await;
                Response::fail(message)
            }
        }
    }

    async fn simple_reply(
        &self,
        actor: ActorId,
        action: AuditAction,
        target: ActorId,
        result: Result<String, AccountError>,
    ) -> Response {
        let (ok, message) = match result {
            Ok(message) => (true, message),
            Err(err) => (false, err.into_string()),
        };

        self.audit
            .record(actor, action, ok, Some(target.to_string()), message.clone())
            .await;

        if ok {
            Response::ok(message)
        } else {
            Response::fail(message)
        }
    }

    async fn backup(&self, actor: ActorId) -> Response {
        let report = match self.manager.create_backup().await {
            Ok(report) => report,
            Err(err) => {
                let message = err.into_string();
                self.audit
                    .record(actor, AuditAction::Backup, false, None, message.clone())
                    .await;
                return Response::fail(message);
            }
        };

        let details = report.to_string();
        match report.primary_copy() {
            Some(copy) => {
                self.audit
                    .record(actor, AuditAction::Backup, true, None, details.clone())
                    .await;
                Response::ok(details).with_attachment(copy.to_path_buf())
            }
            None => {
                self.audit
                    .record(actor, AuditAction::Backup, false, None, details.clone())
                    .await;
                Response::fail(details)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/start", Command::Start)]
    #[case("/HELP", Command::Help)]
    #[case("/add alice", Command::Add("alice".into()))]
    #[case("/add@warden_bot 4242", Command::Add(AccountId::ID(4242)))]
    #[case("/delete  bob ", Command::Delete("bob".into()))]
    #[case("/renew carol", Command::Renew("carol".into()))]
    #[case("/list", Command::List)]
    #[case("/grant 555", Command::Grant(555))]
    #[case("/revoke 555", Command::Revoke(555))]
    #[case("/backup", Command::Backup)]
    #[case("/repair", Command::Repair)]
    fn parses(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(Command::parse(line).unwrap(), expected);
    }

    #[rstest]
    #[case("", ParseError::NotACommand)]
    #[case("hello", ParseError::NotACommand)]
    #[case("/frobnicate", ParseError::Unknown("frobnicate".into()))]
    #[case("/add", ParseError::Usage("/add <username_or_id>"))]
    #[case("/add a b", ParseError::Usage("/add <username_or_id>"))]
    #[case("/grant bob", ParseError::Usage("/grant <numeric_id>"))]
    #[case("/list everything", ParseError::Usage("/list"))]
    fn rejects(#[case] line: &str, #[case] expected: ParseError) {
        assert_eq!(Command::parse(line).unwrap_err(), expected);
    }

    #[test]
    fn scopes() {
        assert_eq!(Command::Help.scope(), CommandScope::Open);
        assert_eq!(Command::List.scope(), CommandScope::Management);
        assert_eq!(Command::Backup.scope(), CommandScope::SuperAdmin);
    }

    #[test]
    fn help_depends_on_role() {
        assert!(help_text(Some(Role::SuperAdmin), 30).contains("/grant"));
        assert!(!help_text(Some(Role::Manager), 30).contains("/grant"));
        assert!(help_text(None, 7).contains("for 7 days"));
        assert!(help_text(None, 7).contains("Ask the admin"));
    }
}
