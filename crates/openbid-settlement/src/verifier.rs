//! Contract rules: hard gate run on every transition before it is signed.
//!
//! The verifier sees the transition plus its resolved inputs and checks the
//! business rules for its [`Command`]:
//!
//! | Command         | Inputs        | Outputs         | Signer         |
//! |-----------------|---------------|-----------------|----------------|
//! | `OpenAuction`   | none          | 1 fresh auction | auctioneer     |
//! | `Bid`           | 1 auction     | `input + bid`   | bidder only    |
//! | `CloseAuction`  | 1 auction     | `input.closed()`| auctioneer     |
//! | `IssueCash`     | ≤ 1 ledger    | 1 ledger        | ledger owner   |
//! | `UpdateLedger`  | 1 ledger      | `input - debit` | ledger owner   |
//!
//! Fail-closed: anything not explicitly allowed is a `Verification` error.

use std::collections::BTreeSet;

use openbid_types::{
    Amount, AuctionRecord, BalanceLedger, Command, ContractState, OpenbidError, PartyId, Result,
    StateAndRef, Transition,
};

/// Validates a proposed transition against contract rules.
pub trait TransitionVerifier: Send + Sync {
    /// `inputs` are the states behind `transition.consumed`, in order.
    fn verify(&self, transition: &Transition, inputs: &[StateAndRef<ContractState>]) -> Result<()>;
}

/// The auction and escrow contract rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractRules;

fn reject(reason: impl Into<String>) -> OpenbidError {
    OpenbidError::Verification {
        reason: reason.into(),
    }
}

fn single_auction(states: &[&ContractState], what: &str) -> Result<AuctionRecord> {
    match states {
        [ContractState::Auction(record)] => Ok(record.clone()),
        _ => Err(reject(format!("expected exactly one auction {what}"))),
    }
}

fn single_ledger(states: &[&ContractState], what: &str) -> Result<BalanceLedger> {
    match states {
        [ContractState::Ledger(ledger)] => Ok(ledger.clone()),
        _ => Err(reject(format!("expected exactly one ledger {what}"))),
    }
}

fn require_signers(transition: &Transition, expected: PartyId) -> Result<()> {
    if transition.required_signers != BTreeSet::from([expected]) {
        return Err(reject(format!("{} must be signed by {expected} only", transition.command)));
    }
    Ok(())
}

impl ContractRules {
    fn verify_open(transition: &Transition, inputs: &[&ContractState], outputs: &[&ContractState]) -> Result<()> {
        if !inputs.is_empty() {
            return Err(reject("opening an auction consumes nothing"));
        }
        let record = single_auction(outputs, "output")?;
        if !record.active || record.winner.is_some() {
            return Err(reject("a new auction must be active with no winner"));
        }
        if record.highest_bid.is_some() || record.highest_bidder.is_some() || record.total_bids_amount != 0 {
            return Err(reject("a new auction must have no bids"));
        }
        if record.bidders.is_empty() {
            return Err(reject("an auction needs at least one bidder"));
        }
        if record.bidders.contains(&record.auctioneer) {
            return Err(reject("the auctioneer cannot bid on its own auction"));
        }
        if record.base_price < 0 {
            return Err(reject("base price must not be negative"));
        }
        require_signers(transition, record.auctioneer)
    }

    fn verify_bid(
        transition: &Transition,
        bidder: PartyId,
        amount: Amount,
        inputs: &[&ContractState],
        outputs: &[&ContractState],
    ) -> Result<()> {
        let input = single_auction(inputs, "input")?;
        let output = single_auction(outputs, "output")?;
        if !input.active {
            return Err(reject("cannot bid on a closed auction"));
        }
        if amount <= 0 {
            return Err(reject("bid amount must be positive"));
        }
        if !input.bidders.contains(&bidder) {
            return Err(reject(format!("{bidder} is not a registered bidder")));
        }
        let expected = input.with_bid(bidder, amount)?.record;
        if output != expected {
            return Err(reject("bid output does not follow the leader rule"));
        }
        require_signers(transition, bidder)?;
        if transition.participants() != input.participants() {
            return Err(reject("every bidder and the auctioneer must record the bid"));
        }
        Ok(())
    }

    fn verify_close(transition: &Transition, inputs: &[&ContractState], outputs: &[&ContractState]) -> Result<()> {
        let input = single_auction(inputs, "input")?;
        let output = single_auction(outputs, "output")?;
        if !input.active {
            return Err(reject("auction already closed"));
        }
        if output != input.closed() {
            return Err(reject("close must only deactivate and fix the winner"));
        }
        require_signers(transition, input.auctioneer)
    }

    fn verify_ledger_op(
        transition: &Transition,
        inputs: &[&ContractState],
        outputs: &[&ContractState],
    ) -> Result<()> {
        let output = single_ledger(outputs, "output")?;
        let input = match inputs {
            [] if matches!(transition.command, Command::UpdateLedger { .. }) => {
                return Err(reject("a ledger update must consume the prior ledger"));
            }
            [] => BalanceLedger::new(output.owner),
            _ => single_ledger(inputs, "input")?,
        };
        if input.owner != output.owner {
            return Err(reject("ledger owner cannot change"));
        }
        match transition.command {
            Command::UpdateLedger {
                counterparty,
                amount,
            } => {
                if output != input.with_debit(counterparty, amount)? {
                    return Err(reject("ledger update must debit exactly one counterparty"));
                }
            }
            Command::IssueCash { amount } => {
                if amount < 0 {
                    return Err(reject("cannot issue a negative amount"));
                }
                let issued: Vec<&PartyId> = output
                    .balances
                    .iter()
                    .filter(|(party, balance)| input.available(party) != Some(**balance))
                    .map(|(party, _)| party)
                    .collect();
                if output != input.with_issued(issued, amount) {
                    return Err(reject("issuance may only set issued balances to the issued amount"));
                }
            }
            _ => return Err(reject(format!("{} is not a ledger command", transition.command))),
        }
        require_signers(transition, output.owner)?;
        if !transition.acknowledgers.is_empty() {
            return Err(reject("a ledger is private to its owner"));
        }
        Ok(())
    }
}

impl TransitionVerifier for ContractRules {
    fn verify(&self, transition: &Transition, inputs: &[StateAndRef<ContractState>]) -> Result<()> {
        if inputs.len() != transition.consumed.len()
            || inputs
                .iter()
                .zip(&transition.consumed)
                .any(|(input, version)| input.version != *version)
        {
            return Err(reject("inputs do not match consumed versions"));
        }
        let inputs: Vec<&ContractState> = inputs.iter().map(|s| &s.state).collect();
        let outputs: Vec<&ContractState> = transition.produced.iter().map(|s| &s.state).collect();

        match transition.command {
            Command::OpenAuction => Self::verify_open(transition, &inputs, &outputs),
            Command::Bid { bidder, amount } => {
                Self::verify_bid(transition, bidder, amount, &inputs, &outputs)
            }
            Command::CloseAuction => Self::verify_close(transition, &inputs, &outputs),
            Command::IssueCash { .. } | Command::UpdateLedger { .. } => {
                Self::verify_ledger_op(transition, &inputs, &outputs)
            }
        }
    }
}
