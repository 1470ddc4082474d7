use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::error;

use crate::proto::v1 as pb;
use crate::swap::SwapError;
use crate::swap::privkey_provider::PrivateKeyProvider;
use crate::swap::store::SwapStore;
use crate::swap::swapper::Swapper;

/// gRPC surface over the swap registrar. Only public swap fields cross this
/// boundary.
pub struct SwapServer<P, S> {
    swapper: Arc<Swapper<P, S>>,
}

impl<P, S> SwapServer<P, S> {
    pub fn new(swapper: Arc<Swapper<P, S>>) -> Self {
        Self { swapper }
    }
}

#[tonic::async_trait]
impl<P, S> pb::swapper_server::Swapper for SwapServer<P, S>
where
    P: PrivateKeyProvider + 'static,
    S: SwapStore + 'static,
{
    async fn init_swap(
        &self,
        request: Request<pb::InitSwapRequest>,
    ) -> Result<Response<pb::InitSwapResponse>, Status> {
        let req = request.into_inner();

        let swapper = self.swapper.clone();
        let public = tokio::task::spawn_blocking(move || swapper.register(&req.pubkey, &req.hash))
            .await
            .map_err(|e| Status::internal(format!("join: {e}")))?
            .map_err(status_from_swap_error)?;

        Ok(Response::new(pb::InitSwapResponse {
            address: public.address.to_string(),
            pubkey: public.service_pubkey.to_bytes(),
            lock_time: public.lock_time,
        }))
    }
}

/// Maps the registration error taxonomy onto gRPC statuses, preserving the
/// retryability distinction for callers. Internal causes are logged, not
/// echoed over the wire.
fn status_from_swap_error(err: SwapError) -> Status {
    match err {
        SwapError::Validation(e) => Status::invalid_argument(e.to_string()),
        SwapError::AlreadyExists => Status::already_exists("swap already in progress"),
        SwapError::Crypto(e) => {
            error!(error = %e, "swap key generation failed");
            Status::internal("failed to create swap")
        }
        SwapError::Storage(e) => {
            error!(error = %e, "swap storage failed");
            Status::internal("swap storage failed")
        }
    }
}
