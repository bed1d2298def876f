use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub connection_acceptor: Arc<dyn ConnectionAcceptor>,
    pub outbound_queue: Arc<dyn OutboundQueue>,
    pub secure_cookies: bool,
    session_hub: Arc<SessionHub>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let signing_key = std::env::var("JWT_SIGNING_KEY")
            .unwrap_or_else(|_| "my-dev-secret-key".to_string())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.token.issuer.clone(),
            audience: settings.token.audience.clone(),
            access_ttl: Duration::from_secs(settings.token.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.token.refresh_ttl_secs),
            signing_key,
        }));

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});

        let token_store: Arc<dyn TokenStore> = match settings.store.backend.as_str() {
            "redis" => {
                let redis_client = redis::Client::open(settings.store.redis_dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisTokenStore::new(
                    redis_manager,
                    Duration::from_millis(settings.store.op_timeout_ms),
                ))
            }
            "memory" => Arc::new(MemoryTokenStore::new()),
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let (identity_repo, pool): (Arc<dyn IdentityRepo>, Option<Pool<MySql>>) =
            match settings.identity.backend.as_str() {
                "mysql" => {
                    let pool = Pool::<MySql>::connect(&settings.identity.mysql_dsn).await?;
                    (Arc::new(MySqlIdentityRepo::new(pool.clone())), Some(pool))
                }
                "memory" => (Arc::new(MemoryIdentityRepo::new()), None),
                other => return Err(anyhow::anyhow!("Unknown identity backend: {}", other)),
            };

        let auth_service: Arc<dyn AuthService> = match settings.auth.backend.as_str() {
            "fake" => Arc::new(FakeAuthService::new()),
            "real" => Arc::new(RealAuthService::new(
                identity_repo,
                credential_hasher,
                token_codec,
                token_store,
            )),
            other => return Err(anyhow::anyhow!("Unknown auth backend: {}", other)),
        };

        let server = Self::assemble(auth_service, pool, settings.http.secure_cookies);

        info!("server started");

        Ok(server)
    }

    /// Wire a server from already-built services. `try_new` lands here after
    /// backend resolution; tests use it directly with memory backends.
    pub fn assemble(
        auth_service: Arc<dyn AuthService>,
        pool: Option<Pool<MySql>>,
        secure_cookies: bool,
    ) -> Self {
        let session_hub = Arc::new(SessionHub::new());
        let connection_acceptor: Arc<dyn ConnectionAcceptor> = session_hub.clone();
        let outbound_queue: Arc<dyn OutboundQueue> = session_hub.clone();

        Self {
            auth_service,
            connection_acceptor,
            outbound_queue,
            secure_cookies,
            session_hub,
            pool,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.session_hub.shutdown().await;
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
