use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use snafu::{ResultExt, Snafu};
use tracing::debug;

type Result<T, E = Error> = std::result::Result<T, E>;

/// Path which reads from stdin instead of a file.
pub const STDIN_PATH: &str = "-";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read file {}", path.display()))]
    ReadFile { source: io::Error, path: PathBuf },

    #[snafu(display("failed to read stdin"))]
    ReadStdin { source: io::Error },

    #[snafu(display("failed to parse {}", path.display()))]
    Parse {
        source: serde_yaml::Error,
        path: PathBuf,
    },
}

/// Reads and parses a YAML (and therefore also JSON) document from `path`, or from stdin if
/// the path is [`STDIN_PATH`].
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = if path == Path::new(STDIN_PATH) {
        let mut contents = String::new();
        io::stdin()
            .read_to_string(&mut contents)
            .context(ReadStdinSnafu)?;
        contents
    } else {
        fs::read_to_string(path).context(ReadFileSnafu { path })?
    };
    debug!(path = %path.display(), bytes = contents.len(), "read input");

    parse(&contents, path)
}

fn parse<T: DeserializeOwned>(contents: &str, path: &Path) -> Result<T> {
    serde_yaml::from_str(contents).context(ParseSnafu { path })
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use stackable_cluster_patches::api::ClusterClassPatch;

    use super::*;

    #[rstest]
    #[case::yaml(indoc! {"
        name: replicas
        definitions:
        - selector:
            apiVersion: controlplane.cluster.x-k8s.io/v1beta1
            kind: KubeadmControlPlaneTemplate
          jsonPatches:
          - op: remove
            path: /spec/replicas
    "})]
    #[case::json(
        r#"{"name": "replicas", "definitions": [{"selector": {"apiVersion": "controlplane.cluster.x-k8s.io/v1beta1", "kind": "KubeadmControlPlaneTemplate"}, "jsonPatches": [{"op": "remove", "path": "/spec/replicas"}]}]}"#
    )]
    fn parse_patch(#[case] contents: &str) {
        let patch: ClusterClassPatch =
            parse(contents, Path::new("patch.yaml")).expect("patch parses");

        assert_eq!(patch.name, "replicas");
        assert_eq!(patch.definitions.len(), 1);
        assert_eq!(patch.definitions[0].json_patches[0].op, "remove");
    }

    #[test]
    fn parse_error_names_the_path() {
        let err = parse::<ClusterClassPatch>("definitions: 3", Path::new("patch.yaml"))
            .expect_err("patch must not parse");

        assert_eq!(err.to_string(), "failed to parse patch.yaml");
    }

    #[test]
    fn missing_file() {
        let err = read::<ClusterClassPatch>(Path::new("/does/not/exist.yaml"))
            .expect_err("file must not exist");

        assert!(matches!(err, Error::ReadFile { .. }));
    }
}
