//! Shared test double: an in-memory connector that records every call and
//! replays scripted results.
#![allow(dead_code)]

use async_trait::async_trait;
use minorm::{
    Connection, ConnectionConfig, ConnectionPool, Connector, Field, OrmError, PlaceholderStyle,
    Result, Row, Value, model, next_id, now,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

model! {
    pub struct User table = "users" {
        id: String = Field::string().primary_key().ddl("varchar(50)").default_with(next_id),
        name: String = Field::string().ddl("varchar(50)"),
        admin: bool = Field::boolean(),
        created_at: f64 = Field::float().default_with(now),
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("fake driver failure: {0}")]
pub struct FakeDriverError(pub String);

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect(u64),
    Query {
        conn: u64,
        sql: String,
        args: Vec<Value>,
        limit: Option<usize>,
    },
    Execute {
        conn: u64,
        sql: String,
        args: Vec<Value>,
    },
    Begin(u64),
    Commit(u64),
    Rollback(u64),
}

struct State {
    events: Vec<Event>,
    results: VecDeque<Vec<Row>>,
    affected: u64,
    fail_execute: Option<String>,
    fail_commit: Option<String>,
    fail_ping: bool,
    pings: Vec<u64>,
    style: PlaceholderStyle,
    next_id: u64,
    gate: Option<Arc<Barrier>>,
}

#[derive(Clone)]
pub struct RecordingConnector {
    state: Arc<Mutex<State>>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::with_style(PlaceholderStyle::QuestionMark)
    }

    pub fn with_style(style: PlaceholderStyle) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                events: Vec::new(),
                results: VecDeque::new(),
                affected: 1,
                fail_execute: None,
                fail_commit: None,
                fail_ping: false,
                pings: Vec::new(),
                style,
                next_id: 1,
                gate: None,
            })),
        }
    }

    /// Rows returned by the next query.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state.lock().unwrap().results.push_back(rows);
    }

    pub fn set_affected(&self, affected: u64) {
        self.state.lock().unwrap().affected = affected;
    }

    pub fn fail_next_execute(&self, message: &str) {
        self.state.lock().unwrap().fail_execute = Some(message.to_string());
    }

    pub fn fail_next_commit(&self, message: &str) {
        self.state.lock().unwrap().fail_commit = Some(message.to_string());
    }

    pub fn fail_next_ping(&self) {
        self.state.lock().unwrap().fail_ping = true;
    }

    /// Connection ids in ping order.
    pub fn pings(&self) -> Vec<u64> {
        self.state.lock().unwrap().pings.clone()
    }

    /// Every query waits on `gate` before returning.
    pub fn gate_queries(&self, gate: Arc<Barrier>) {
        self.state.lock().unwrap().gate = Some(gate);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    /// Events other than connection setup.
    pub fn statements(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| !matches!(event, Event::Connect(_)))
            .collect()
    }

    pub async fn pool(&self, config: ConnectionConfig) -> ConnectionPool {
        ConnectionPool::connect(config, self.clone()).await.unwrap()
    }
}

pub fn config() -> ConnectionConfig {
    ConnectionConfig::new("www-data", "www-data", "awesome")
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect()
}

pub fn user_row(id: &str, name: &str, admin: bool, created_at: f64) -> Row {
    row(&[
        ("id", Value::from(id)),
        ("name", Value::from(name)),
        ("admin", Value::Integer(admin as i64)),
        ("created_at", Value::Float(created_at)),
    ])
}

pub fn driver_error(err: &OrmError) -> Option<&FakeDriverError> {
    match err {
        OrmError::Database(inner) => inner.downcast_ref::<FakeDriverError>(),
        _ => None,
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(&self, _config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.events.push(Event::Connect(id));

        Ok(Box::new(RecordingConnection {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct RecordingConnection {
    id: u64,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Connection for RecordingConnection {
    fn placeholder_style(&self) -> PlaceholderStyle {
        self.state.lock().unwrap().style
    }

    async fn query(&mut self, sql: &str, args: &[Value], limit: Option<usize>) -> Result<Vec<Row>> {
        let (mut rows, gate) = {
            let mut state = self.state.lock().unwrap();
            state.events.push(Event::Query {
                conn: self.id,
                sql: sql.to_string(),
                args: args.to_vec(),
                limit,
            });
            (state.results.pop_front().unwrap_or_default(), state.gate.clone())
        };

        if let Some(gate) = gate {
            gate.wait().await;
        }

        if let Some(n) = limit {
            rows.truncate(n);
        }
        Ok(rows)
    }

    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Execute {
            conn: self.id,
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        match state.fail_execute.take() {
            Some(message) => Err(OrmError::database(FakeDriverError(message))),
            None => Ok(state.affected),
        }
    }

    async fn begin(&mut self) -> Result<()> {
        self.state.lock().unwrap().events.push(Event::Begin(self.id));
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Commit(self.id));
        match state.fail_commit.take() {
            Some(message) => Err(OrmError::database(FakeDriverError(message))),
            None => Ok(()),
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        self.state.lock().unwrap().events.push(Event::Rollback(self.id));
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.pings.push(self.id);
        if std::mem::take(&mut state.fail_ping) {
            return Err(OrmError::database(FakeDriverError("gone away".into())));
        }
        Ok(())
    }
}
