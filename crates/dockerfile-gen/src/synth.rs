//! Dockerfile text synthesis
//!
//! Pure, deterministic text generation with no I/O. The deploy service is
//! responsible for writing the result into the build context and for
//! rejecting inputs that would produce an unrunnable image (e.g. an empty
//! run command).

/// Inputs for a synthesized build definition.
#[derive(Debug, Clone)]
pub struct DockerfileSpec {
    /// Base runtime image, already resolved from the declared runtime kind.
    pub image: String,

    /// Command that prepares the project inside the image.
    pub build_command: String,

    /// Command that starts the application, tokenized on whitespace into an
    /// exec-form CMD.
    pub run_command: String,

    /// Port the application listens on inside the container.
    pub internal_port: u16,
}

/// Synthesize the Dockerfile text for a native deployment.
pub fn synthesize(spec: &DockerfileSpec) -> String {
    let mut lines = Vec::new();
    lines.push(format!("FROM {}\n", spec.image));
    lines.push("WORKDIR /app\n".to_string());
    lines.push("COPY . .\n".to_string());
    lines.push(format!("RUN {}\n", spec.build_command));
    lines.push(format!("EXPOSE {}\n", spec.internal_port));
    lines.push(format!("CMD [{}]\n", exec_form(&spec.run_command)));
    lines.concat()
}

/// Render a whitespace-tokenized command as an exec-form argument list.
fn exec_form(command: &str) -> String {
    command
        .split_whitespace()
        .map(|token| format!("\"{}\"", token))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_exact_output() {
        let spec = DockerfileSpec {
            image: "node:20-alpine".to_string(),
            build_command: "npm install".to_string(),
            run_command: "npm start".to_string(),
            internal_port: 4300,
        };

        assert_eq!(
            synthesize(&spec),
            "FROM node:20-alpine\n\
             WORKDIR /app\n\
             COPY . .\n\
             RUN npm install\n\
             EXPOSE 4300\n\
             CMD [\"npm\", \"start\"]\n"
        );
    }

    #[test]
    fn test_instructions_appear_in_order() {
        let spec = DockerfileSpec {
            image: "golang:1.22-alpine".to_string(),
            build_command: "go build -o server .".to_string(),
            run_command: "./server".to_string(),
            internal_port: 4300,
        };

        let text = synthesize(&spec);
        let positions: Vec<usize> = ["FROM ", "WORKDIR ", "COPY ", "RUN ", "EXPOSE ", "CMD "]
            .iter()
            .map(|needle| text.find(needle).unwrap())
            .collect();

        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_run_command_tokenized_into_exec_form() {
        let spec = DockerfileSpec {
            image: "node:20-alpine".to_string(),
            build_command: "npm ci".to_string(),
            run_command: "a b c".to_string(),
            internal_port: 3000,
        };

        let text = synthesize(&spec);
        assert!(text.contains("CMD [\"a\", \"b\", \"c\"]"));
    }

    #[test]
    fn test_repeated_whitespace_collapses() {
        assert_eq!(exec_form("npm   run  start"), "\"npm\", \"run\", \"start\"");
    }

    #[test]
    fn test_empty_run_command_yields_empty_exec_form() {
        // Callers must reject this upstream; synthesis itself stays total.
        let spec = DockerfileSpec {
            image: "node:20-alpine".to_string(),
            build_command: "npm install".to_string(),
            run_command: "".to_string(),
            internal_port: 4300,
        };

        assert!(synthesize(&spec).contains("CMD []"));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let spec = DockerfileSpec {
            image: "python:3.12-slim".to_string(),
            build_command: "pip install -r requirements.txt".to_string(),
            run_command: "python app.py".to_string(),
            internal_port: 8000,
        };

        assert_eq!(synthesize(&spec), synthesize(&spec));
    }
}
