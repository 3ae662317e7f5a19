//! ABI bindings for the two classroom contracts

use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface SimpleCounter {
        event NewValue(address indexed sender, uint256 newNumber);

        function addToWhiteList(address _address) external;
        function removeFromWhiteList(address _address) external;
        function increaseNumber() external;
        function decreaseNumber() external;
        function retrieveNumber() external view returns (uint256);
        function whiteList(address account) external view returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface VotationSystem {
        event VotationFinished(int32 winner);

        function addCandidate(int32 id) external;
        function addVoter(address voter) external;
        function vote(int32 id) external;
        function finishVotation() external;
        function candidates(uint256 index) external view returns (int32 id, uint256 votes);
        function whitelist(address account) external view returns (bool);
        function votationFinished() external view returns (bool);
        function winner() external view returns (int32);
    }
}
