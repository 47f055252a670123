use crate::error::NetworkingError;

pub fn check_status(res: &reqwest::Response) -> Result<(), NetworkingError> {
    let status = res.status();
    if !status.is_success() {
        return Err(NetworkingError::ServerResponse {
            status_code: status.as_u16(),
            url: res.url().to_string(),
        });
    }
    Ok(())
}
