//! Bounded async prover pool
//!
//! 증명 생성은 CPU 작업이므로 tokio blocking pool에서 실행한다.
//! 세마포어가 동시 실행 수를 제한하고, 나머지는 도착 순서대로 대기한다.
//!
//! `serve_lines` answers newline-delimited JSON requests. Replies come back in
//! input order, each written once every earlier reply is out, with at most
//! twice `concurrency` requests in flight.
//!
//! Dropping the returned future does not cancel a proof that already
//! started. The blocking task runs to completion and drops its witness.

use std::pin::pin;
use std::sync::Arc;

use futures::{future, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio_stream::wrappers::LinesStream;

use crate::error::{describe_json_error, FailureResponse, ProofError, Result};
use crate::services::backend::ProvingBackend;
use crate::services::proof_service::{ProofOutcome, ProofService};
use crate::services::prover::RandomnessSource;
use crate::types::{EligibilityRequest, ProofReply};

pub struct ProverPool<B, R> {
    service: Arc<ProofService<B, R>>,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl<B, R> Clone for ProverPool<B, R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            permits: self.permits.clone(),
            concurrency: self.concurrency,
        }
    }
}

impl<B, R> ProverPool<B, R>
where
    B: ProvingBackend + 'static,
    R: RandomnessSource + 'static,
{
    pub fn new(service: Arc<ProofService<B, R>>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            service,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    pub fn service(&self) -> &Arc<ProofService<B, R>> {
        &self.service
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Requests currently allowed to start without waiting
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn request_proof(&self, balance: f64, gpa: f64) -> Result<ProofOutcome> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProofError::internal("prover pool closed"))?;

        let service = self.service.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            service.request_proof(balance, gpa)
        })
        .await
        .map_err(|e| ProofError::internal(format!("prover task failed: {}", e)))?
    }

    pub async fn handle(&self, request: EligibilityRequest) -> ProofReply {
        match self.request_proof(request.bank_balance, request.gpa).await {
            Ok(outcome) => ProofReply::Success(outcome.to_response()),
            Err(err) => ProofReply::Failure(FailureResponse::from(&err)),
        }
    }

    /// One JSON request line in, one reply record out
    pub async fn handle_line(&self, line: &str) -> ProofReply {
        match serde_json::from_str::<EligibilityRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                let err = ProofError::InvalidRequest(describe_json_error(&e));
                ProofReply::Failure(FailureResponse::from(&err))
            }
        }
    }

    /// Answer every non-blank line of `input`, one reply line each
    ///
    /// Returns the number of replies written.
    pub async fn serve_lines<I, W>(&self, input: I, output: &mut W) -> anyhow::Result<usize>
    where
        I: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let replies = LinesStream::new(input.lines())
            .filter(|line| future::ready(!matches!(line, Ok(l) if l.trim().is_empty())))
            .map(|line| {
                let pool = self.clone();
                async move {
                    let line = line?;
                    Ok::<_, std::io::Error>(pool.handle_line(&line).await)
                }
            })
            .buffered(self.concurrency * 2);
        let mut replies = pin!(replies);

        let mut served = 0;
        while let Some(reply) = replies.next().await {
            let mut record = serde_json::to_vec(&reply?)?;
            record.push(b'\n');
            output.write_all(&record).await?;
            output.flush().await?;
            served += 1;
        }
        Ok(served)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::backend::Groth16Backend;
    use crate::services::prover::SeededRandomness;
    use crate::test_utils;

    fn pool(concurrency: usize) -> ProverPool<Groth16Backend, SeededRandomness> {
        let service = ProofService::new(
            Groth16Backend::new(test_utils::artifacts()),
            SeededRandomness::new(7),
        );
        ProverPool::new(Arc::new(service), concurrency)
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let pool = pool(2);

        let handles: Vec<_> = [(40000.0, 3.5), (60000.0, 3.5), (1000.0, 2.5), (49999.99, 3.0)]
            .into_iter()
            .map(|(balance, gpa)| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.request_proof(balance, gpa).await })
            })
            .collect();

        let mut eligible = Vec::new();
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert!(outcome.verified);
            eligible.push(outcome.eligible().unwrap());
        }

        assert_eq!(eligible, vec![true, false, false, true]);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let pool = pool(1);
        let reply = pool
            .handle(EligibilityRequest {
                bank_balance: -5.0,
                gpa: 3.5,
            })
            .await;

        match reply {
            ProofReply::Failure(f) => assert_eq!(f.error_kind, ErrorKind::OutOfDomain),
            ProofReply::Success(_) => panic!("negative balance accepted"),
        }
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_serve_lines_keeps_input_order() {
        let pool = pool(1);
        let input = concat!(
            "{\"bankBalance\": 60000.0, \"gpa\": 3.5}\n",
            "\n",
            "{\"bankBalance\": 40000.0, \"gpa\": 3.5}\n",
            "{\"bankBalance\": \"secret-123\"}\n",
            "{\"bankBalance\": -1.0, \"gpa\": 3.5}\n",
            "{\"bankBalance\": 1000.0, \"gpa\": 3.9}\n",
        );

        let mut output = Vec::new();
        let served = pool
            .serve_lines(input.as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(served, 5);

        let text = String::from_utf8(output).unwrap();
        assert!(!text.contains("secret-123"));

        let replies: Vec<ProofReply> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(replies.len(), 5);

        let eligible = |reply: &ProofReply| match reply {
            ProofReply::Success(response) => {
                let (_, signals) = response.decode().unwrap();
                Some(signals.eligible().unwrap())
            }
            ProofReply::Failure(_) => None,
        };
        let kind = |reply: &ProofReply| match reply {
            ProofReply::Failure(f) => Some(f.error_kind),
            ProofReply::Success(_) => None,
        };

        assert_eq!(eligible(&replies[0]), Some(false));
        assert_eq!(eligible(&replies[1]), Some(true));
        assert_eq!(kind(&replies[2]), Some(ErrorKind::InvalidRequest));
        assert_eq!(kind(&replies[3]), Some(ErrorKind::OutOfDomain));
        assert_eq!(eligible(&replies[4]), Some(true));
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_serve_lines_replies_before_input_ends() {
        let pool = pool(2);
        let (mut client, server) = tokio::io::duplex(4096);
        let (mut replies_in, mut replies_out) = tokio::io::duplex(4096);

        let serving = tokio::spawn(async move {
            pool.serve_lines(tokio::io::BufReader::new(server), &mut replies_out)
                .await
                .unwrap()
        });

        client
            .write_all(b"{\"bankBalance\": 40000.0, \"gpa\": 3.5}\n")
            .await
            .unwrap();

        // input is still open here
        let mut reader = tokio::io::BufReader::new(&mut replies_in);
        let mut first = String::new();
        reader.read_line(&mut first).await.unwrap();
        let reply: ProofReply = serde_json::from_str(&first).unwrap();
        assert!(reply.is_success());

        drop(client);
        assert_eq!(serving.await.unwrap(), 1);
    }

    #[test]
    fn test_zero_concurrency_clamped() {
        assert_eq!(pool(0).concurrency(), 1);
    }
}
