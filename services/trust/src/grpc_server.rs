use tonic::{Request, Response, Status};
use uuid::Uuid;

use warden_domain::device::Fingerprint;
use warden_domain::id::{DeviceId, SessionId, UserId};
use warden_proto::trust::{
    Empty, RecordLoginRequest, RecordLoginResponse, RecordLogoutRequest, RecordStepUpRequest,
    ReportAnomalyRequest, trust_service_server::TrustService,
};

use crate::state::AppState;

#[derive(Clone)]
pub struct TrustGrpcServer {
    pub state: AppState,
}

fn parse_uuid(value: &str, field: &'static str) -> Result<Uuid, Status> {
    value
        .parse::<Uuid>()
        .map_err(|_| Status::invalid_argument(format!("invalid {field}")))
}

fn fingerprint_from_proto(fp: Option<warden_proto::trust::Fingerprint>) -> Fingerprint {
    let Some(fp) = fp else {
        return Fingerprint::default();
    };
    Fingerprint {
        browser: fp.browser,
        browser_version: fp.browser_version,
        platform: fp.platform,
        platform_version: fp.platform_version,
        device: fp.device,
        device_type: fp.device_type,
        mobile: fp.mobile,
        robot: fp.robot,
        ip: fp.ip,
        source: fp.source,
    }
}

#[tonic::async_trait]
impl TrustService for TrustGrpcServer {
    async fn record_login(
        &self,
        request: Request<RecordLoginRequest>,
    ) -> Result<Response<RecordLoginResponse>, Status> {
        let req = request.into_inner();
        let user_id = UserId(parse_uuid(&req.user_id, "user_id")?);
        let outcome = self
            .state
            .auth_flow()
            .on_login(
                req.device_token.as_deref(),
                fingerprint_from_proto(req.fingerprint),
                user_id,
            )
            .await?;

        Ok(Response::new(RecordLoginResponse {
            device_id: outcome.device.id.to_string(),
            session_id: outcome.session.id.to_string(),
            device_status: outcome.device.status.as_str().to_owned(),
            session_status: outcome.session.status.as_str().to_owned(),
            device_registered: outcome.device_registered,
        }))
    }

    async fn record_logout(
        &self,
        request: Request<RecordLogoutRequest>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let user_id = UserId(parse_uuid(&req.user_id, "user_id")?);
        let session_id = SessionId(parse_uuid(&req.session_id, "session_id")?);
        self.state
            .auth_flow()
            .on_logout(session_id, user_id, req.forget_device)
            .await?;
        Ok(Response::new(Empty {}))
    }

    async fn record_step_up(
        &self,
        request: Request<RecordStepUpRequest>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let user_id = UserId(parse_uuid(&req.user_id, "user_id")?);
        let device_id = DeviceId(parse_uuid(&req.device_id, "device_id")?);
        let session_id = SessionId(parse_uuid(&req.session_id, "session_id")?);
        self.state
            .auth_flow()
            .on_step_up(device_id, session_id, user_id)
            .await?;
        Ok(Response::new(Empty {}))
    }

    async fn report_anomaly(
        &self,
        request: Request<ReportAnomalyRequest>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let device_id = DeviceId(parse_uuid(&req.device_id, "device_id")?);
        let acting_user = req
            .acting_user_id
            .as_deref()
            .map(|v| parse_uuid(v, "acting_user_id").map(UserId))
            .transpose()?;
        tracing::warn!(%device_id, reason = %req.reason, "anomaly reported");
        self.state
            .auth_flow()
            .on_anomaly(device_id, acting_user)
            .await?;
        Ok(Response::new(Empty {}))
    }
}
