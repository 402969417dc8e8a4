use std::time::{Duration, Instant};

use anyhow::Result;

pub mod homework;
pub mod util;

use homework::HomeworkFetcher;

use crate::{config::Config, telegram::TelegramClient};

trait Runnable: Sized {
    fn new(config: &Config, telegram: TelegramClient) -> Result<Self>;
    async fn run(&mut self) -> Result<()>;
}

/// Define a job (by name) and it's accompanying 'runner'.
///
/// This 'runner' should be some struct which implements the `Runnable` trait
macro_rules! define_jobs {
    ($(($jobname:ident, $runnable:ident)),+) => {
        pub enum JobKind {
            $($jobname),*
        }

        enum JobRunner {
            $($jobname($runnable)),*
        }

        impl JobRunner {
            fn new(jobkind: JobKind, config: &Config, telegram: TelegramClient) -> Result<JobRunner> {
                match jobkind {
                    $(JobKind::$jobname => Ok(JobRunner::$jobname($runnable::new(config, telegram)?))),*
                }
            }

            async fn run(&mut self) -> Result<()> {
                match self {
                    $(JobRunner::$jobname(fetcher) => fetcher.run().await),*
                }
            }
        }
    };
}

#[cfg(not(test))]
define_jobs!(
    (Homework, HomeworkFetcher)
);

#[cfg(test)]
define_jobs!(
    (Homework, HomeworkFetcher),
    (Failing, FailingRunner)
);

#[cfg(test)]
struct FailingRunner;

#[cfg(test)]
impl Runnable for FailingRunner {
    fn new(_config: &Config, _telegram: TelegramClient) -> Result<Self> {
        Ok(FailingRunner)
    }

    async fn run(&mut self) -> Result<()> {
        anyhow::bail!("runner always fails")
    }
}

struct Job {
    last_ran: Option<Instant>,
    run_interval: Duration,
    job_runner: JobRunner,
}
impl Job {
    fn should_run(&self) -> bool {
        if let Some(time) = self.last_ran {
            return (Instant::now() - time) >= self.run_interval;
        }
        true
    }

    fn new(
        jobkind: JobKind,
        interval: Duration,
        config: &Config,
        telegram: TelegramClient,
    ) -> Result<Self> {
        Ok(Job {
            last_ran: None,
            run_interval: interval,
            job_runner: JobRunner::new(jobkind, config, telegram)?,
        })
    }

    async fn run(&mut self) -> Result<()> {
        let result = self.job_runner.run().await;
        // Failed runs count for scheduling too, so a broken poll retries at
        // the polling cadence instead of on every tick
        self.last_ran = Some(Instant::now());
        result
    }
}

pub struct Jobs {
    joblist: Vec<Job>,
    config: Config,
    telegram: TelegramClient,
}

impl Jobs {
    /// Initializes an empty job queue over the loaded configuration. Jobs
    /// share the one Telegram client so its rate limit covers the chat, not
    /// a single sender.
    pub fn init(config: Config, telegram: TelegramClient) -> Self {
        Jobs {
            joblist: vec![],
            config,
            telegram,
        }
    }

    pub fn add(mut self, jobkind: JobKind, interval: Duration) -> Result<Self> {
        self.joblist
            .push(Job::new(jobkind, interval, &self.config, self.telegram.clone())?);
        Ok(self)
    }

    /// Polls jobs in the defined order. Executing them in said order.
    pub async fn poll(&mut self) -> Result<()> {
        for job in &mut self.joblist {
            if job.should_run() {
                job.run().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            praktikum_token: "praktikum-token".into(),
            telegram_token: "telegram-token".into(),
            chat_id: "12345".into(),
            poll_interval: Duration::from_secs(5),
            log_dir: ".".into(),
        }
    }

    fn test_job(jobkind: JobKind, interval: Duration) -> Job {
        let config = test_config();
        let telegram = TelegramClient::new(&config);
        Job::new(jobkind, interval, &config, telegram).unwrap()
    }

    #[test]
    fn job_runs_immediately_when_never_ran() {
        let job = test_job(JobKind::Homework, Duration::from_secs(5));

        assert!(job.should_run());
    }

    #[test]
    fn job_waits_out_its_interval() {
        let mut job = test_job(JobKind::Homework, Duration::from_secs(3600));
        job.last_ran = Some(Instant::now());

        assert!(!job.should_run());
    }

    #[test]
    fn job_is_due_once_the_interval_elapsed() {
        let mut job = test_job(JobKind::Homework, Duration::ZERO);
        job.last_ran = Some(Instant::now());

        assert!(job.should_run());
    }

    #[tokio::test]
    async fn failed_run_still_advances_last_ran() {
        let mut job = test_job(JobKind::Failing, Duration::from_secs(3600));

        let result = job.run().await;

        assert!(result.is_err());
        assert!(job.last_ran.is_some());
        assert!(!job.should_run());
    }
}
