use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::{role_for_user, unknown_role_error, CampusFlowAuthSource};
use crate::engine::{Engine, EngineError};
use crate::limits::{DAY_END, DAY_START};
use crate::observability::{self, AUTH_FAILURES_TOTAL, QUERIES_TOTAL, QUERY_DURATION_SECONDS};
use crate::role::{Capability, Role};
use crate::sql::{self, Command};

pub struct CampusFlowHandler {
    engine: Arc<Engine>,
    query_parser: Arc<CampusFlowQueryParser>,
}

impl CampusFlowHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(CampusFlowQueryParser),
        }
    }

    fn resolve_role<C: ClientInfo>(&self, client: &C) -> PgWireResult<Role> {
        let user = client.metadata().get("user").map(String::as_str);
        role_for_user(user).map_err(|e| unknown_role_error("ERROR", e))
    }

    /// Parse, authorize and execute one statement for a session role.
    async fn run(&self, role: Role, sql: &str) -> PgWireResult<Response> {
        let cmd = sql::parse_sql(sql).map_err(sql_err)?;
        let label = observability::command_label(&cmd);

        let needed = cmd.required_capability();
        if !role.can(needed) {
            metrics::counter!(AUTH_FAILURES_TOTAL).increment(1);
            return Err(denied(role, needed));
        }

        let started = Instant::now();
        let result = self.execute_command(cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(QUERIES_TOTAL, "command" => label, "status" => status).increment(1);
        metrics::histogram!(QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, cmd: Command) -> PgWireResult<Response> {
        match cmd {
            Command::InsertBooking {
                event_name,
                resource_id,
                start,
                end,
            } => {
                if start < DAY_START || end > DAY_END {
                    return Err(user_error(
                        "22023",
                        format!("times must lie within {DAY_START}..={DAY_END}, got [{start}, {end})"),
                    ));
                }
                self.engine
                    .request_booking(&event_name, &resource_id, start, end)
                    .await
                    .map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::SelectBookings { resource_id } => {
                let bookings = match resource_id {
                    Some(rid) => self.engine.get_bookings(&rid).await,
                    None => self.engine.list_schedule().await.into_bookings(),
                };

                let schema = Arc::new(bookings_schema());
                let rows: Vec<PgWireResult<_>> = bookings
                    .into_iter()
                    .map(|b| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&b.id.to_string())?;
                        encoder.encode_field(&b.event_name)?;
                        encoder.encode_field(&b.resource_id)?;
                        encoder.encode_field(&b.span.start)?;
                        encoder.encode_field(&b.span.end)?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                )))
            }
            Command::SelectUsage => {
                let stats = self.engine.list_usage_stats();

                let schema = Arc::new(usage_schema());
                let rows: Vec<PgWireResult<_>> = stats
                    .stats
                    .into_iter()
                    .map(|s| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&s.resource_id)?;
                        encoder.encode_field(&(s.count as i64))?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                )))
            }
            Command::SelectResources => {
                let resources = self.engine.list_resources();

                let schema = Arc::new(resources_schema());
                let rows: Vec<PgWireResult<_>> = resources
                    .into_iter()
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.id)?;
                        encoder.encode_field(&r.kind)?;
                        encoder.encode_field(&i64::from(r.capacity))?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                )))
            }
        }
    }
}

fn text_field(name: &str, ty: Type) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, ty, FieldFormat::Text)
}

fn bookings_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("event_name", Type::VARCHAR),
        text_field("resource_id", Type::VARCHAR),
        text_field("start", Type::INT8),
        text_field("end", Type::INT8),
    ]
}

fn usage_schema() -> Vec<FieldInfo> {
    vec![
        text_field("resource_id", Type::VARCHAR),
        text_field("count", Type::INT8),
    ]
}

fn resources_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("kind", Type::VARCHAR),
        text_field("capacity", Type::INT8),
    ]
}

/// Row schema for a statement, judged from the table after FROM.
/// Placeholders make full parsing impossible at describe time.
fn result_schema(sql: &str) -> Vec<FieldInfo> {
    let lower = sql.to_lowercase();
    if !lower.trim_start().starts_with("select") {
        return vec![];
    }
    let table = lower
        .split_whitespace()
        .skip_while(|w| *w != "from")
        .nth(1)
        .map(|t| t.trim_matches(|c: char| c == ';' || c == '"'));
    match table {
        Some("bookings") => bookings_schema(),
        Some("usage_stats") => usage_schema(),
        Some("resources") => resources_schema(),
        _ => vec![],
    }
}

#[async_trait]
impl SimpleQueryHandler for CampusFlowHandler {
    async fn do_query<C>(
        &self,
        client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let role = self.resolve_role(client)?;
        Ok(vec![self.run(role, query).await?])
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct CampusFlowQueryParser;

#[async_trait]
impl QueryParser for CampusFlowQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for CampusFlowHandler {
    type Statement = String;
    type QueryParser = CampusFlowQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let role = self.resolve_role(client)?;
        let sql = substitute_params(portal);
        self.run(role, &sql).await
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            result_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start
                && let Ok(n) = sql[start..i].parse::<usize>()
            {
                max = max.max(n);
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let params: Vec<Option<String>> = portal
        .parameters
        .iter()
        .map(|p| p.as_ref().map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
        .collect();
    substitute_text_params(&portal.statement.statement, &params)
}

/// Single left-to-right pass. `$n` inside a quoted literal is left alone,
/// and substituted values are never rescanned.
fn substitute_text_params(sql: &str, params: &[Option<String>]) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();
    let mut in_literal = false;

    while let Some((i, c)) = chars.next() {
        if in_literal {
            result.push(c);
            if c == '\'' {
                // '' is an escaped quote, not the end of the literal
                if let Some(&(_, '\'')) = chars.peek() {
                    chars.next();
                    result.push('\'');
                } else {
                    in_literal = false;
                }
            }
            continue;
        }

        match c {
            '\'' => {
                in_literal = true;
                result.push(c);
            }
            '$' => {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = j + 1;
                    chars.next();
                }
                let param = sql[start..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| params.get(idx));
                match param {
                    Some(Some(text)) => {
                        result.push('\'');
                        result.push_str(&text.replace('\'', "''"));
                        result.push('\'');
                    }
                    Some(None) => result.push_str("NULL"),
                    None => result.push_str(&sql[i..end]),
                }
            }
            _ => result.push(c),
        }
    }
    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct CampusFlowFactory {
    handler: Arc<CampusFlowHandler>,
    auth_handler: Arc<
        CleartextPasswordAuthStartupHandler<CampusFlowAuthSource, DefaultServerParameterProvider>,
    >,
    noop: Arc<NoopHandler>,
}

impl CampusFlowFactory {
    pub fn new(engine: Arc<Engine>, password: String) -> Self {
        let auth_source = CampusFlowAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(CampusFlowHandler::new(engine)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for CampusFlowFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    let factory = Arc::new(CampusFlowFactory::new(engine, password));
    pgwire::tokio::process_socket(socket, tls, factory).await
}

// ── Errors ───────────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

/// SQLSTATE for each engine rejection.
fn engine_sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::Conflict { .. } => "23P01",
        EngineError::InvalidRange { .. } => "22023",
        EngineError::UnknownResource(_) => "23503",
        EngineError::EmptyEventName => "23502",
        EngineError::LimitExceeded(_) => "54000",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    user_error(engine_sqlstate(&e), e.to_string())
}

fn sql_err(e: sql::SqlError) -> PgWireError {
    user_error("42601", e.to_string())
}

fn denied(role: Role, needed: Capability) -> PgWireError {
    user_error(
        "42501",
        format!("role {} is not allowed to {needed}", role.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_params_finds_highest() {
        assert_eq!(count_params("SELECT * FROM bookings"), 0);
        assert_eq!(
            count_params("INSERT INTO bookings VALUES ($1, $2, $3, $4)"),
            4
        );
        assert_eq!(count_params("SELECT $2, $10, $1"), 10);
    }

    #[test]
    fn substitute_quotes_and_nulls() {
        let sql = substitute_text_params(
            "INSERT INTO bookings VALUES ($1, $2, $3, $4)",
            &[
                Some("Dean's talk".into()),
                Some("A301".into()),
                Some("9".into()),
                None,
            ],
        );
        assert_eq!(
            sql,
            "INSERT INTO bookings VALUES ('Dean''s talk', 'A301', '9', NULL)"
        );
    }

    #[test]
    fn substitute_does_not_clobber_two_digit_placeholders() {
        let params: Vec<Option<String>> = (1..=10).map(|i| Some(i.to_string())).collect();
        let sql = substitute_text_params("$1 $10", &params);
        assert_eq!(sql, "'1' '10'");
    }

    #[test]
    fn substitute_never_rescans_bound_values() {
        let params = [
            Some("A301".to_string()),
            Some("Q&A for $1 holders".to_string()),
            Some("9".to_string()),
            Some("11".to_string()),
        ];
        let sql = substitute_text_params("INSERT INTO bookings VALUES ($2, $1, $3, $4)", &params);
        assert_eq!(
            sql,
            "INSERT INTO bookings VALUES ('Q&A for $1 holders', 'A301', '9', '11')"
        );
        match sql::parse_sql(&sql).unwrap() {
            Command::InsertBooking {
                event_name,
                resource_id,
                ..
            } => {
                assert_eq!(event_name, "Q&A for $1 holders");
                assert_eq!(resource_id, "A301");
            }
            other => panic!("expected InsertBooking, got {other:?}"),
        }
    }

    #[test]
    fn substitute_skips_placeholders_inside_literals() {
        let params = [Some("R101".to_string())];
        let sql = substitute_text_params(
            "INSERT INTO bookings VALUES ('it''s $1 off', $1, 9, 10)",
            &params,
        );
        assert_eq!(
            sql,
            "INSERT INTO bookings VALUES ('it''s $1 off', 'R101', 9, 10)"
        );
    }

    #[test]
    fn substitute_leaves_unbound_placeholders() {
        let sql = substitute_text_params("SELECT $3, $0, $", &[Some("x".into())]);
        assert_eq!(sql, "SELECT $3, $0, $");
    }

    #[test]
    fn result_schema_by_table() {
        assert_eq!(result_schema("SELECT * FROM bookings").len(), 5);
        assert_eq!(
            result_schema("select * from bookings where resource_id = $1").len(),
            5
        );
        assert_eq!(result_schema("SELECT * FROM usage_stats;").len(), 2);
        assert_eq!(result_schema("SELECT id FROM resources").len(), 3);
        assert!(result_schema("INSERT INTO bookings VALUES ($1, $2, $3, $4)").is_empty());
        assert!(result_schema("SELECT * FROM holds").is_empty());
    }

    #[test]
    fn engine_errors_map_to_distinct_sqlstates() {
        let errors = [
            EngineError::Conflict {
                resource_id: "R101".into(),
                with: ulid::Ulid::new(),
            },
            EngineError::InvalidRange { start: 2, end: 1 },
            EngineError::UnknownResource("Z1".into()),
            EngineError::EmptyEventName,
            EngineError::LimitExceeded("x"),
        ];
        let codes: Vec<&str> = errors.iter().map(engine_sqlstate).collect();
        assert_eq!(codes, vec!["23P01", "22023", "23503", "23502", "54000"]);
    }
}
