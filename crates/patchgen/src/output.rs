use std::io::Write;

use serde::Serialize;
use snafu::{ResultExt, Snafu};
use stackable_cluster_patches::hooks::{GeneratePatchesResponse, PatchType, ResponseStatus};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to decode patch of item with uid {uid:?}"))]
    DecodePatch {
        source: serde_json::Error,
        uid: String,
    },

    #[snafu(display("failed to serialize response"))]
    SerializeResponse { source: serde_json::Error },

    #[snafu(display("failed to write response"))]
    Write { source: std::io::Error },
}

/// A response with the patches inlined as JSON instead of base64 encoded bytes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecodedResponse<'a> {
    status: ResponseStatus,

    #[serde(skip_serializing_if = "str::is_empty")]
    message: &'a str,

    items: Vec<DecodedResponseItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecodedResponseItem<'a> {
    uid: &'a str,
    patch_type: PatchType,
    patch: serde_json::Value,
}

impl<'a> DecodedResponse<'a> {
    fn try_from_response(response: &'a GeneratePatchesResponse) -> Result<Self> {
        let items = response
            .items
            .iter()
            .map(|item| {
                let patch = serde_json::from_slice(&item.patch)
                    .context(DecodePatchSnafu { uid: &item.uid })?;

                Ok(DecodedResponseItem {
                    uid: &item.uid,
                    patch_type: item.patch_type,
                    patch,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            status: response.status,
            message: &response.message,
            items,
        })
    }
}

/// Writes the response as pretty printed JSON, followed by a newline.
pub fn write(
    mut writer: impl Write,
    response: &GeneratePatchesResponse,
    decode_patches: bool,
) -> Result<()> {
    if decode_patches {
        let decoded = DecodedResponse::try_from_response(response)?;
        serde_json::to_writer_pretty(&mut writer, &decoded).context(SerializeResponseSnafu)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, response).context(SerializeResponseSnafu)?;
    }

    writeln!(writer).context(WriteSnafu)
}
