use crate::actor::Actor;
use crate::error::Error;
use crate::orm::users;
use actix_session::{Session, SessionExt};
use actix_web::dev::{self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web::Data, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::future::{ready, Ready};
use std::rc::Rc;

/// Session key holding the authenticated user's id.
///
/// Written by the authentication layer, which lives outside this crate.
pub const SESSION_USER_KEY: &str = "user_id";

/// Client data stored for a single request cycle.
#[derive(Clone, Debug, Default)]
pub struct ClientCtxInner {
    /// User data. Optional. None is a guest.
    pub client: Option<users::Model>,
}

impl ClientCtxInner {
    pub async fn from_session(session: &Session, db: &DatabaseConnection) -> Self {
        let user_id = match session.get::<i32>(SESSION_USER_KEY) {
            Ok(Some(user_id)) => user_id,
            Ok(None) => return Self::default(),
            Err(err) => {
                log::warn!("Unreadable session user id: {}", err);
                return Self::default();
            }
        };

        match users::Entity::find_by_id(user_id).one(db).await {
            Ok(Some(user)) => Self { client: Some(user) },
            Ok(None) => {
                // Account is gone; drop the stale session entry.
                session.remove(SESSION_USER_KEY);
                Self::default()
            }
            Err(err) => {
                log::error!("Failed to load session user {}: {}", user_id, err);
                Self::default()
            }
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    pub fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            // Existing record in extensions; pull it and return clone.
            Some(cbox) => Self(cbox.clone()),
            // No existing record; create and insert it.
            None => {
                let cbox = Data::new(ClientCtxInner::default());
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    pub fn get_user(&self) -> Option<&users::Model> {
        self.0.client.as_ref()
    }

    /// Require a logged in, unsuspended user. Returns the workflow actor.
    pub fn require_actor(&self) -> Result<Actor, Error> {
        let user = self.get_user().ok_or(Error::Unauthenticated)?;
        if user.is_suspended {
            return Err(Error::Authorization("Your account is suspended".to_string()));
        }
        Ok(Actor::from(user))
    }

    /// Require an admin actor.
    pub fn require_admin(&self) -> Result<Actor, Error> {
        let actor = self.require_actor()?;
        actor.require_admin()?;
        Ok(actor)
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        Box::pin(async move {
            // Without a database there is no user to load; routes see a guest.
            if let Some(db) = req.app_data::<Data<DatabaseConnection>>().cloned() {
                let session = req.get_session();
                let inner = ClientCtxInner::from_session(&session, &db).await;
                req.extensions_mut().insert(Data::new(inner));
            } else {
                log::error!("Database pool is not registered as app data");
            }

            svc.call(req).await
        })
    }
}
