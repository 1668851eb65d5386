//! # Storage
//!
//! Users, sessions, the two creche counters and device fingerprints.
//!
//! ## Redis layout
//!
//! - `usuarios:next_id`: id counter
//! - `usuarios:cpf`, `usuarios:telefone`: hash of SHA-256 digest to user id, uniqueness indices
//! - `usuario:{id}`: hash with `nome` (absent while pending), `cpf`, `telefone` (all encrypted),
//!   `cpf_hash`, `telefone_hash`, `admin`
//! - `sessao:{token}`: user id, expires with the session
//! - `creches`: hash with `entregues` and `prometidas`
//! - `dispositivos`: set of fingerprints
//!
//! Registration and counter edits run as Lua scripts so the uniqueness check and the
//! `entregues <= prometidas` rule hold under concurrent requests.
//!
//! ## Memory
//!
//! Same operations behind a mutex. Default when `REDIS_URL` is unset, used by the tests.
use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use forms::{
    Campo, Progress,
    progress::EditError,
};
use redis::{
    AsyncCommands, Client, RedisError, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use thiserror::Error;

const NEXT_ID_KEY: &str = "usuarios:next_id";
const CPF_INDEX: &str = "usuarios:cpf";
const TELEFONE_INDEX: &str = "usuarios:telefone";
const CRECHES_KEY: &str = "creches";
const DISPOSITIVOS_KEY: &str = "dispositivos";

const CREATE_USER_SCRIPT: &str = r#"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 or redis.call('HEXISTS', KEYS[2], ARGV[2]) == 1 then
    return 0
end
local id = redis.call('INCR', KEYS[3])
redis.call('HSET', KEYS[1], ARGV[1], id)
redis.call('HSET', KEYS[2], ARGV[2], id)
local key = 'usuario:' .. id
redis.call('HSET', key, 'cpf_hash', ARGV[1], 'telefone_hash', ARGV[2], 'cpf', ARGV[3], 'telefone', ARGV[4], 'admin', ARGV[5])
if ARGV[6] ~= '' then
    redis.call('HSET', key, 'nome', ARGV[6])
end
return id
"#;

const UPDATE_CRECHES_SCRIPT: &str = r#"
local entregues = tonumber(redis.call('HGET', KEYS[1], 'entregues'))
local prometidas = tonumber(redis.call('HGET', KEYS[1], 'prometidas'))
if entregues == nil or prometidas == nil then
    return {-1}
end
local valor = tonumber(ARGV[2])
if ARGV[1] == 'entregues' then
    if valor > prometidas then
        return {-2}
    end
    entregues = valor
else
    if valor < entregues then
        return {-3}
    end
    prometidas = valor
end
redis.call('HSET', KEYS[1], 'entregues', entregues, 'prometidas', prometidas)
return {entregues, prometidas}
"#;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("CPF or phone already registered")]
    Conflict,

    #[error("Counters not initialised")]
    Missing,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: u64,
    /// Encrypted, `None` until the user completes their name.
    pub nome: Option<String>,
    pub cpf: String,
    pub telefone: String,
    pub cpf_hash: String,
    pub telefone_hash: String,
    pub admin: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub nome: Option<String>,
    pub cpf: String,
    pub telefone: String,
    pub cpf_hash: String,
    pub telefone_hash: String,
    pub admin: bool,
}

#[derive(Default)]
pub struct Memory {
    next_id: u64,
    users: HashMap<u64, UserRecord>,
    cpf_index: HashMap<String, u64>,
    telefone_index: HashMap<String, u64>,
    sessions: HashMap<String, (u64, Instant)>,
    creches: Option<Progress>,
    fingerprints: HashSet<String>,
}

pub enum Database {
    Redis(ConnectionManager),
    Memory(Mutex<Memory>),
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, DatabaseError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

fn user_key(id: u64) -> String {
    format!("usuario:{id}")
}

fn session_key(token: &str) -> String {
    format!("sessao:{token}")
}

fn user_from_hash(id: u64, mut fields: HashMap<String, String>) -> Result<UserRecord, DatabaseError> {
    let mut take = |field: &str| {
        fields
            .remove(field)
            .ok_or_else(|| DatabaseError::Corrupt(format!("{} missing {field}", user_key(id))))
    };

    Ok(UserRecord {
        id,
        cpf: take("cpf")?,
        telefone: take("telefone")?,
        cpf_hash: take("cpf_hash")?,
        telefone_hash: take("telefone_hash")?,
        admin: take("admin")? == "1",
        nome: take("nome").ok(),
    })
}

impl Memory {
    fn create_user(&mut self, user: NewUser) -> Result<u64, DatabaseError> {
        if self.cpf_index.contains_key(&user.cpf_hash)
            || self.telefone_index.contains_key(&user.telefone_hash)
        {
            return Err(DatabaseError::Conflict);
        }

        self.next_id += 1;
        let id = self.next_id;

        self.cpf_index.insert(user.cpf_hash.clone(), id);
        self.telefone_index.insert(user.telefone_hash.clone(), id);
        self.users.insert(
            id,
            UserRecord {
                id,
                nome: user.nome,
                cpf: user.cpf,
                telefone: user.telefone,
                cpf_hash: user.cpf_hash,
                telefone_hash: user.telefone_hash,
                admin: user.admin,
            },
        );

        Ok(id)
    }

    fn user_mut(&mut self, id: u64) -> Result<&mut UserRecord, DatabaseError> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::Corrupt(format!("{} missing", user_key(id))))
    }

    fn update_creches(&mut self, campo: Campo, valor: u32) -> Result<Progress, DatabaseError> {
        let creches = self.creches.as_mut().ok_or(DatabaseError::Missing)?;

        creches.check(campo, valor)?;
        creches.apply(campo, valor);

        Ok(*creches)
    }
}

impl Database {
    pub fn memory() -> Self {
        Database::Memory(Mutex::new(Memory::default()))
    }

    fn lock(memory: &Mutex<Memory>) -> std::sync::MutexGuard<'_, Memory> {
        memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates both counters at 0 unless they already exist.
    pub async fn init_creches(&self) -> Result<(), DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let _: bool = conn.hset_nx(CRECHES_KEY, "entregues", 0).await?;
                let _: bool = conn.hset_nx(CRECHES_KEY, "prometidas", 0).await?;
            }
            Database::Memory(memory) => {
                Self::lock(memory).creches.get_or_insert_default();
            }
        }

        Ok(())
    }

    pub async fn get_creches(&self) -> Result<Option<Progress>, DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let (entregues, prometidas): (Option<u32>, Option<u32>) = redis::cmd("HMGET")
                    .arg(CRECHES_KEY)
                    .arg("entregues")
                    .arg("prometidas")
                    .query_async(&mut conn)
                    .await?;

                Ok(entregues
                    .zip(prometidas)
                    .map(|(entregues, prometidas)| Progress::new(entregues, prometidas)))
            }
            Database::Memory(memory) => Ok(Self::lock(memory).creches),
        }
    }

    /// Writes one counter if `entregues <= prometidas` still holds afterwards.
    pub async fn update_creches(&self, campo: Campo, valor: u32) -> Result<Progress, DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let result: Vec<i64> = Script::new(UPDATE_CRECHES_SCRIPT)
                    .key(CRECHES_KEY)
                    .arg(campo.as_str())
                    .arg(valor)
                    .invoke_async(&mut conn)
                    .await?;

                match result.as_slice() {
                    [-1] => Err(DatabaseError::Missing),
                    [-2] => Err(EditError::DeliveredAbovePromised.into()),
                    [-3] => Err(EditError::PromisedBelowDelivered.into()),
                    [entregues, prometidas] => Ok(Progress::new(
                        counter(*entregues)?,
                        counter(*prometidas)?,
                    )),
                    other => Err(DatabaseError::Corrupt(format!(
                        "unexpected counter update reply {other:?}"
                    ))),
                }
            }
            Database::Memory(memory) => Self::lock(memory).update_creches(campo, valor),
        }
    }

    /// Atomically claims the CPF and phone hashes and stores the record.
    pub async fn create_user(&self, user: NewUser) -> Result<u64, DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let id: u64 = Script::new(CREATE_USER_SCRIPT)
                    .key(CPF_INDEX)
                    .key(TELEFONE_INDEX)
                    .key(NEXT_ID_KEY)
                    .arg(&user.cpf_hash)
                    .arg(&user.telefone_hash)
                    .arg(&user.cpf)
                    .arg(&user.telefone)
                    .arg(if user.admin { "1" } else { "0" })
                    .arg(user.nome.as_deref().unwrap_or_default())
                    .invoke_async(&mut conn)
                    .await?;

                match id {
                    0 => Err(DatabaseError::Conflict),
                    id => Ok(id),
                }
            }
            Database::Memory(memory) => Self::lock(memory).create_user(user),
        }
    }

    pub async fn find_by_cpf_hash(&self, cpf_hash: &str) -> Result<Option<u64>, DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                Ok(conn.hget(CPF_INDEX, cpf_hash).await?)
            }
            Database::Memory(memory) => Ok(Self::lock(memory).cpf_index.get(cpf_hash).copied()),
        }
    }

    pub async fn find_by_telefone_hash(
        &self,
        telefone_hash: &str,
    ) -> Result<Option<u64>, DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                Ok(conn.hget(TELEFONE_INDEX, telefone_hash).await?)
            }
            Database::Memory(memory) => {
                Ok(Self::lock(memory).telefone_index.get(telefone_hash).copied())
            }
        }
    }

    pub async fn get_user(&self, id: u64) -> Result<Option<UserRecord>, DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let fields: HashMap<String, String> = conn.hgetall(user_key(id)).await?;

                if fields.is_empty() {
                    return Ok(None);
                }

                user_from_hash(id, fields).map(Some)
            }
            Database::Memory(memory) => Ok(Self::lock(memory).users.get(&id).cloned()),
        }
    }

    pub async fn set_user_name(&self, id: u64, nome: &str) -> Result<(), DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let _: () = conn.hset(user_key(id), "nome", nome).await?;
            }
            Database::Memory(memory) => {
                Self::lock(memory).user_mut(id)?.nome = Some(nome.to_string());
            }
        }

        Ok(())
    }

    pub async fn set_admin(&self, id: u64) -> Result<(), DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let _: () = conn.hset(user_key(id), "admin", "1").await?;
            }
            Database::Memory(memory) => {
                Self::lock(memory).user_mut(id)?.admin = true;
            }
        }

        Ok(())
    }

    pub async fn create_session(
        &self,
        token: &str,
        user_id: u64,
        ttl: Duration,
    ) -> Result<(), DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let _: () = conn
                    .set_ex(session_key(token), user_id, ttl.as_secs().max(1))
                    .await?;
            }
            Database::Memory(memory) => {
                let mut memory = Self::lock(memory);
                let now = Instant::now();

                // expired tokens are never looked up again, drop them here
                memory.sessions.retain(|_, (_, expires)| *expires > now);
                memory
                    .sessions
                    .insert(token.to_string(), (user_id, now + ttl));
            }
        }

        Ok(())
    }

    pub async fn get_session(&self, token: &str) -> Result<Option<u64>, DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                Ok(conn.get(session_key(token)).await?)
            }
            Database::Memory(memory) => {
                let mut memory = Self::lock(memory);

                match memory.sessions.get(token) {
                    Some(&(user_id, expires)) if expires > Instant::now() => Ok(Some(user_id)),
                    Some(_) => {
                        memory.sessions.remove(token);
                        Ok(None)
                    }
                    None => Ok(None),
                }
            }
        }
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let _: () = conn.del(session_key(token)).await?;
            }
            Database::Memory(memory) => {
                Self::lock(memory).sessions.remove(token);
            }
        }

        Ok(())
    }

    /// Returns whether the fingerprint was new.
    pub async fn record_fingerprint(&self, fingerprint: &str) -> Result<bool, DatabaseError> {
        match self {
            Database::Redis(connection) => {
                let mut conn = connection.clone();
                let added: u32 = conn.sadd(DISPOSITIVOS_KEY, fingerprint).await?;
                Ok(added > 0)
            }
            Database::Memory(memory) => {
                Ok(Self::lock(memory).fingerprints.insert(fingerprint.to_string()))
            }
        }
    }
}

fn counter(value: i64) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| DatabaseError::Corrupt(format!("counter out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use forms::{Campo, Progress, progress::EditError};

    use super::{Database, DatabaseError, NewUser};

    fn new_user(cpf_hash: &str, telefone_hash: &str) -> NewUser {
        NewUser {
            nome: None,
            cpf: "enc-cpf".to_string(),
            telefone: "enc-tel".to_string(),
            cpf_hash: cpf_hash.to_string(),
            telefone_hash: telefone_hash.to_string(),
            admin: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let database = Database::memory();

        let id = database.create_user(new_user("c1", "t1")).await.unwrap();

        assert_eq!(database.find_by_cpf_hash("c1").await.unwrap(), Some(id));
        assert_eq!(database.find_by_telefone_hash("t1").await.unwrap(), Some(id));
        assert_eq!(database.find_by_cpf_hash("c2").await.unwrap(), None);

        let user = database.get_user(id).await.unwrap().unwrap();
        assert!(user.nome.is_none());
        assert!(!user.admin);
    }

    #[tokio::test]
    async fn test_duplicate_hashes_conflict() {
        let database = Database::memory();
        database.create_user(new_user("c1", "t1")).await.unwrap();

        assert!(matches!(
            database.create_user(new_user("c1", "t2")).await,
            Err(DatabaseError::Conflict)
        ));
        assert!(matches!(
            database.create_user(new_user("c2", "t1")).await,
            Err(DatabaseError::Conflict)
        ));
        assert_eq!(database.find_by_cpf_hash("c2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_name_and_admin() {
        let database = Database::memory();
        let id = database.create_user(new_user("c1", "t1")).await.unwrap();

        database.set_user_name(id, "enc-nome").await.unwrap();
        database.set_admin(id).await.unwrap();

        let user = database.get_user(id).await.unwrap().unwrap();
        assert_eq!(user.nome.as_deref(), Some("enc-nome"));
        assert!(user.admin);
    }

    #[tokio::test]
    async fn test_sessions_expire() {
        let database = Database::memory();

        database.create_session("a", 7, Duration::from_secs(60)).await.unwrap();
        database.create_session("b", 8, Duration::ZERO).await.unwrap();

        assert_eq!(database.get_session("a").await.unwrap(), Some(7));
        assert_eq!(database.get_session("b").await.unwrap(), None);

        database.delete_session("a").await.unwrap();
        assert_eq!(database.get_session("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_purged() {
        let database = Database::memory();

        for i in 0..1000 {
            database
                .create_session(&format!("old-{i}"), i, Duration::ZERO)
                .await
                .unwrap();
        }
        database.create_session("live", 1, Duration::from_secs(60)).await.unwrap();

        assert_eq!(database.get_session("live").await.unwrap(), Some(1));
        let Database::Memory(memory) = &database else {
            unreachable!()
        };
        assert_eq!(Database::lock(memory).sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_creches() {
        let database = Database::memory();

        assert_eq!(database.get_creches().await.unwrap(), None);
        assert!(matches!(
            database.update_creches(Campo::Prometidas, 1).await,
            Err(DatabaseError::Missing)
        ));

        database.init_creches().await.unwrap();
        assert_eq!(database.get_creches().await.unwrap(), Some(Progress::new(0, 0)));

        database.update_creches(Campo::Prometidas, 10).await.unwrap();
        let creches = database.update_creches(Campo::Entregues, 4).await.unwrap();
        assert_eq!(creches, Progress::new(4, 10));

        assert!(matches!(
            database.update_creches(Campo::Entregues, 11).await,
            Err(DatabaseError::Edit(EditError::DeliveredAbovePromised))
        ));
        assert!(matches!(
            database.update_creches(Campo::Prometidas, 3).await,
            Err(DatabaseError::Edit(EditError::PromisedBelowDelivered))
        ));

        database.init_creches().await.unwrap();
        assert_eq!(database.get_creches().await.unwrap(), Some(Progress::new(4, 10)));
    }

    #[tokio::test]
    async fn test_fingerprints() {
        let database = Database::memory();

        assert!(database.record_fingerprint("abc").await.unwrap());
        assert!(!database.record_fingerprint("abc").await.unwrap());
    }
}
